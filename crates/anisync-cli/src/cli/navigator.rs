//! Terminal navigation sink.

use std::fmt;

use anisync_core::app::{Navigator, Route};

/// Returned when the gate redirected; maps to exit code 2.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SetupRequired {
    pub route: Route,
}

impl fmt::Display for SetupRequired {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Setup required: {}", self.route.description())
    }
}

impl std::error::Error for SetupRequired {}

/// Command that completes the step a route stands for.
pub fn setup_hint(route: Route) -> &'static str {
    match route {
        Route::Index => "anisync status",
        Route::PlexServerUrl => "anisync setup server-url <URL>",
        Route::PlexSetup => "anisync setup plex",
        Route::AnilistSetup => "anisync setup anilist --client-id <ID>",
        Route::AnilistAuthCode => "anisync setup anilist --redirect-url <URL>",
    }
}

/// Prints each redirect as the setup step to run next.
#[derive(Debug, Default)]
pub struct TerminalNavigator;

impl Navigator for TerminalNavigator {
    fn navigate(&mut self, route: Route) {
        eprintln!("{}", SetupRequired { route });
        eprintln!("  Run: {}", setup_hint(route));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_setup_route_has_a_command() {
        for route in Route::ALL {
            assert!(setup_hint(route).starts_with("anisync "));
        }
        assert_eq!(setup_hint(Route::PlexSetup), "anisync setup plex");
        assert_eq!(
            setup_hint(Route::AnilistSetup),
            "anisync setup anilist --client-id <ID>"
        );
    }

    #[test]
    fn test_setup_required_names_the_step() {
        let err = SetupRequired {
            route: Route::AnilistAuthCode,
        };
        assert_eq!(
            err.to_string(),
            "Setup required: Paste the AniList authorization redirect"
        );
    }
}
