//! Help output checks against the built binary: the rewritten command
//! surface is what users see, not the raw generated one.

use assert_cmd::Command;
use predicates::prelude::*;

fn reefctl() -> Command {
    Command::cargo_bin("reefctl").unwrap()
}

#[test]
fn root_help_lists_bundled_services() {
    reefctl()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("cfg"));
}

#[test]
fn sessions_help_hides_status_updates() {
    reefctl()
        .args(["cfg", "sessions", "--help"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("create")
                .and(predicate::str::contains("delete"))
                .and(predicate::str::contains("update").not()),
        );
}

#[test]
fn versioned_sessions_help_matches_the_bare_path() {
    reefctl()
        .args(["cfg", "v2", "sessions", "--help"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("create").and(predicate::str::contains("update").not()),
        );
}

#[test]
fn components_help_lists_updatemany() {
    reefctl()
        .args(["cfg", "components", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("updatemany"));
}

#[test]
fn updatemany_help_lists_replacement_options() {
    reefctl()
        .args(["cfg", "components", "updatemany", "--help"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("--filter-ids")
                .and(predicate::str::contains("--patch"))
                .and(predicate::str::contains("--filter-tags")),
        );
}

#[test]
fn sessions_create_help_lists_the_composed_options() {
    reefctl()
        .args(["cfg", "sessions", "create", "--help"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("--target-group")
                .and(predicate::str::contains("GROUPNAME"))
                .and(predicate::str::contains("--target-groups-name").not()),
        );
}

#[test]
fn sources_are_a_v3_surface_only() {
    reefctl()
        .args(["cfg", "v3", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("sources"));
    reefctl()
        .args(["cfg", "v2", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("sources").not());
}

#[test]
fn unknown_command_fails_with_usage_error() {
    reefctl()
        .args(["cfg", "bogus"])
        .assert()
        .failure();
}
