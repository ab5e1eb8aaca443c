//! Integration tests for Settings config loading with layered precedence.
//!
//! These tests never read the real global config: they pass an explicit
//! (temporary) global path or none at all.

use std::fs;

use tempfile::TempDir;

use domkit::application::ApplicationError;
use domkit::config::{project_config_path, OutputFormat, Settings};

#[test]
fn given_project_config_when_load_then_overrides_defaults() {
    // Arrange
    let project = TempDir::new().unwrap();
    fs::write(
        project_config_path(project.path()),
        "[output]\nformat = \"tree\"\ncolor = false\n",
    )
    .unwrap();

    // Act
    let settings = Settings::load_from(None, Some(project.path())).expect("load settings");

    // Assert
    assert_eq!(settings.output.format, OutputFormat::Tree);
    assert!(!settings.output.color);
    assert_eq!(settings.markers.text, "#text");
}

#[test]
fn given_global_only_when_load_then_global_applies() {
    let global_dir = TempDir::new().unwrap();
    let global = global_dir.path().join("domkit.toml");
    fs::write(&global, "[markers]\ntagname = \"tag\"\n").unwrap();
    let project = TempDir::new().unwrap();

    let settings = Settings::load_from(Some(&global), Some(project.path())).unwrap();

    assert_eq!(settings.markers.tagname, "tag");
    assert_eq!(settings.markers.children, "children");
}

#[test]
fn given_missing_global_file_when_load_then_ignored() {
    let dir = TempDir::new().unwrap();
    let settings = Settings::load_from(Some(&dir.path().join("absent.toml")), None).unwrap();
    assert_eq!(settings, Settings::default());
}

#[test]
fn given_unknown_format_in_file_when_load_then_config_error() {
    let project = TempDir::new().unwrap();
    fs::write(project_config_path(project.path()), "[output]\nformat = \"xml\"\n").unwrap();

    let result = Settings::load_from(None, Some(project.path()));

    assert!(matches!(result, Err(ApplicationError::Config { .. })));
}

#[test]
fn given_duplicate_markers_in_file_when_load_then_config_error() {
    let project = TempDir::new().unwrap();
    fs::write(
        project_config_path(project.path()),
        "[markers]\ntext = \"children\"\n",
    )
    .unwrap();

    let err = Settings::load_from(None, Some(project.path())).unwrap_err();

    assert!(err.to_string().contains("distinct"));
}

#[test]
fn given_loaded_settings_when_to_toml_then_contains_sections() {
    let text = Settings::default().to_toml().unwrap();
    assert!(text.contains("[markers]"));
    assert!(text.contains("[output]"));
    assert!(text.contains("format = \"html\""));
}
