use crate::models::{PartialTheme, ThemePreferences};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ThemeState {
    preferences: ThemePreferences,
}

impl ThemeState {
    pub fn preferences(&self) -> &ThemePreferences {
        &self.preferences
    }

    pub fn hydrate(&mut self, partial: PartialTheme) {
        self.preferences = ThemePreferences::merged(partial);
    }

    pub fn toggle_dark_mode(&mut self) {
        self.preferences.dark_mode = !self.preferences.dark_mode;
    }

    pub fn toggle_compact_mode(&mut self) {
        self.preferences.compact_mode = !self.preferences.compact_mode;
    }

    pub fn toggle_weather_display(&mut self) {
        self.preferences.show_weather = !self.preferences.show_weather;
    }

    /// Any name is accepted here; palette checks belong to the caller.
    pub fn set_primary_color(&mut self, name: impl Into<String>) -> bool {
        let name = name.into();
        if self.preferences.primary_color == name {
            return false;
        }
        self.preferences.primary_color = name;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toggles_flip_their_flag_only() {
        let mut theme = ThemeState::default();

        theme.toggle_dark_mode();
        assert!(theme.preferences().dark_mode);
        assert!(!theme.preferences().compact_mode);
        assert!(theme.preferences().show_weather);

        theme.toggle_compact_mode();
        assert!(theme.preferences().compact_mode);

        theme.toggle_weather_display();
        assert!(!theme.preferences().show_weather);

        theme.toggle_dark_mode();
        assert!(!theme.preferences().dark_mode);
        assert_eq!(theme.preferences().primary_color, "indigo");
    }

    #[test]
    fn set_primary_color_accepts_names_outside_palette() {
        let mut theme = ThemeState::default();
        assert!(theme.set_primary_color("teal"));
        assert_eq!(theme.preferences().primary_color, "teal");
        assert!(!theme.set_primary_color("teal"));
    }

    #[test]
    fn hydrate_replaces_previous_preferences() {
        let mut theme = ThemeState::default();
        theme.toggle_compact_mode();
        theme.hydrate(PartialTheme {
            primary_color: Some("green".to_string()),
            ..PartialTheme::default()
        });
        assert_eq!(
            theme.preferences(),
            &ThemePreferences {
                dark_mode: false,
                primary_color: "green".to_string(),
                compact_mode: false,
                show_weather: true,
            }
        );
    }
}
