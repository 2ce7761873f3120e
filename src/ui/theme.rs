use ratatui::style::{Color, Modifier, Style};
use serde::{Deserialize, Serialize};

/// Color scheme for the dashboard
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Theme {
    pub name: String,

    /// Accent color (tab bar, titles)
    pub primary: String,

    /// Chart bars and map markers
    pub secondary: String,

    pub success: String,

    /// Selection highlight
    pub warning: String,

    pub error: String,

    pub text: String,

    pub text_muted: String,

    /// Placeholder text ("No detections yet")
    pub text_disabled: String,

    pub border_focused: String,

    pub border_normal: String,
}

impl Default for Theme {
    fn default() -> Self {
        Self::dark()
    }
}

impl Theme {
    /// Parse a color string to ratatui Color
    pub fn parse_color(color_str: &str) -> Color {
        match color_str.trim() {
            "Reset" => Color::Reset,
            "Black" => Color::Black,
            "Red" => Color::Red,
            "Green" => Color::Green,
            "Yellow" => Color::Yellow,
            "Blue" => Color::Blue,
            "Magenta" => Color::Magenta,
            "Cyan" => Color::Cyan,
            "Gray" | "Grey" => Color::Gray,
            "DarkGray" | "DarkGrey" => Color::DarkGray,
            "White" => Color::White,
            s if s.starts_with('#') => parse_hex_color(s)
                .map(|(r, g, b)| Color::Rgb(r, g, b))
                .unwrap_or(Color::Reset),
            s => s.parse::<u8>().map(Color::Indexed).unwrap_or(Color::Reset),
        }
    }

    pub fn primary(&self) -> Color {
        Self::parse_color(&self.primary)
    }

    pub fn secondary(&self) -> Color {
        Self::parse_color(&self.secondary)
    }

    pub fn success(&self) -> Color {
        Self::parse_color(&self.success)
    }

    pub fn warning(&self) -> Color {
        Self::parse_color(&self.warning)
    }

    pub fn error(&self) -> Color {
        Self::parse_color(&self.error)
    }

    pub fn text(&self) -> Color {
        Self::parse_color(&self.text)
    }

    pub fn text_muted(&self) -> Color {
        Self::parse_color(&self.text_muted)
    }

    pub fn text_disabled(&self) -> Color {
        Self::parse_color(&self.text_disabled)
    }

    pub fn highlight_style(&self) -> Style {
        Style::default()
            .fg(self.warning())
            .add_modifier(Modifier::BOLD)
    }

    pub fn border_style(&self, focused: bool) -> Style {
        if focused {
            Style::default().fg(Self::parse_color(&self.border_focused))
        } else {
            Style::default().fg(Self::parse_color(&self.border_normal))
        }
    }

    pub fn dark() -> Self {
        Self {
            name: "dark".to_string(),
            primary: "#88c0d0".to_string(),
            secondary: "#b48ead".to_string(),
            success: "#a3be8c".to_string(),
            warning: "#ebcb8b".to_string(),
            error: "#bf616a".to_string(),
            text: "#eceff4".to_string(),
            text_muted: "#d8dee9".to_string(),
            text_disabled: "#4c566a".to_string(),
            border_focused: "#81a1c1".to_string(),
            border_normal: "#3b4252".to_string(),
        }
    }

    pub fn light() -> Self {
        Self {
            name: "light".to_string(),
            primary: "#1e66f5".to_string(),
            secondary: "#8839ef".to_string(),
            success: "#40a02b".to_string(),
            warning: "#df8e1d".to_string(),
            error: "#d20f39".to_string(),
            text: "#4c4f69".to_string(),
            text_muted: "#6c6f85".to_string(),
            text_disabled: "#9ca0b0".to_string(),
            border_focused: "#1e66f5".to_string(),
            border_normal: "#bcc0cc".to_string(),
        }
    }

    pub fn for_mode(dark_mode: bool) -> Self {
        if dark_mode {
            Self::dark()
        } else {
            Self::light()
        }
    }
}

fn parse_hex_color(hex: &str) -> Option<(u8, u8, u8)> {
    let hex = hex.trim_start_matches('#');
    if hex.len() != 6 {
        return None;
    }

    let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
    let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
    let b = u8::from_str_radix(&hex[4..6], 16).ok()?;

    Some((r, g, b))
}
