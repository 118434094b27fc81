// crashlog-sleuth - platform/paths.rs
//
// Resolves the per-game documents folder used by the Documents Validation
// and File Integrity analyzers. Configuration/data directory resolution
// lives in `platform::config::PlatformPaths`; this module only adds the
// game-specific Documents lookup that analyzer needs on top of it.
//
// Favors the `directories` crate over hand-rolled environment-variable
// lookups, and degrades to `None` rather than failing the caller.

use std::path::PathBuf;

use directories::UserDirs;

/// `<MyDocuments>/My Games/<GameType>`, or `None` if the user's documents
/// folder cannot be determined on this platform.
pub fn game_documents_path(game_type: &str) -> Option<PathBuf> {
    let documents = UserDirs::new()?.document_dir()?.to_path_buf();
    Some(documents.join("My Games").join(game_type))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn documents_path_joins_my_games_and_game_type() {
        if let Some(path) = game_documents_path("Fallout4") {
            assert!(path.ends_with(PathBuf::from("My Games").join("Fallout4")));
        }
    }
}
