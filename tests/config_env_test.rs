//! Environment overrides live in their own test binary: they mutate
//! process-wide state.

use tempfile::TempDir;

use domkit::config::{project_config_path, OutputFormat, Settings};

#[test]
fn given_env_vars_when_load_then_override_files() {
    // Arrange
    let project = TempDir::new().unwrap();
    std::fs::write(
        project_config_path(project.path()),
        "[output]\nformat = \"html\"\n[markers]\ntext = \"$t\"\n",
    )
    .unwrap();
    std::env::set_var("DOMKIT_OUTPUT__FORMAT", "tree");
    std::env::set_var("DOMKIT_OUTPUT__COLOR", "false");
    std::env::set_var("DOMKIT_MARKERS__CHILDREN", "kids");

    // Act
    let settings = Settings::load_from(None, Some(project.path()));
    std::env::remove_var("DOMKIT_OUTPUT__FORMAT");
    std::env::remove_var("DOMKIT_OUTPUT__COLOR");
    std::env::remove_var("DOMKIT_MARKERS__CHILDREN");
    let settings = settings.unwrap();

    // Assert
    assert_eq!(settings.output.format, OutputFormat::Tree);
    assert!(!settings.output.color);
    assert_eq!(settings.markers.children, "kids");
    assert_eq!(settings.markers.text, "$t");
}
