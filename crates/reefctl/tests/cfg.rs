//! End-to-end tests for the `cfg` command tree: parse a command line,
//! run the shim pipeline, and inspect the request that reaches the
//! transport.

use std::rc::Rc;

use serde_json::{json, Value};

use reef_spec::HttpMethod;
use reefctl::invoke;
use reefctl::services::cfg;
use reefctl::transport::{ApiRequest, RecordingTransport, Transport};
use reefctl::{CliError, CommandTree};

fn build() -> (CommandTree, Rc<RecordingTransport>) {
    let recorder = Rc::new(RecordingTransport::new(json!({"ok": true})));
    let tree = cfg::build(Rc::clone(&recorder) as Rc<dyn Transport>).unwrap();
    (tree, recorder)
}

fn run(tree: &CommandTree, args: &[&str]) -> Result<Value, CliError> {
    invoke::run_line(tree, args)
}

fn last(recorder: &RecordingTransport) -> ApiRequest {
    recorder.last_request().unwrap()
}

#[test]
fn updatemany_sends_patch_against_the_collection() {
    let (tree, recorder) = build();
    run(
        &tree,
        &["cfg", "components", "updatemany", "--filter-ids", "test1,test2"],
    )
    .unwrap();
    let request = last(&recorder);
    assert_eq!(request.method, HttpMethod::Patch);
    assert_eq!(request.path, "/apis/cfg/v2/components");
    assert_eq!(
        request.body,
        Some(json!({"filters": {"ids": ["test1", "test2"]}, "patch": {}}))
    );
}

#[test]
fn bare_and_versioned_paths_build_identical_requests() {
    let (tree, recorder) = build();
    run(
        &tree,
        &["cfg", "components", "updatemany", "--filter-ids", "a,b", "--enabled", "true"],
    )
    .unwrap();
    run(
        &tree,
        &["cfg", "v2", "components", "updatemany", "--filter-ids", "a,b", "--enabled", "true"],
    )
    .unwrap();
    let requests = recorder.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0], requests[1]);
}

#[test]
fn updatemany_without_filters_is_a_usage_error() {
    let (tree, recorder) = build();
    let err = run(
        &tree,
        &["cfg", "components", "updatemany", "--enabled", "true"],
    )
    .unwrap_err();
    assert!(matches!(err, CliError::InvalidUsage(_)));
    assert!(err.to_string().contains("at least one filter"));
    assert!(recorder.last_request().is_none());
}

#[test]
fn explicit_false_filter_counts_as_a_filter() {
    let (tree, recorder) = build();
    run(
        &tree,
        &["cfg", "components", "updatemany", "--filter-enabled", "false"],
    )
    .unwrap();
    assert_eq!(
        last(&recorder).body,
        Some(json!({"filters": {"enabled": false}, "patch": {}}))
    );
}

#[test]
fn patch_field_spellings_follow_the_version() {
    let (tree, recorder) = build();
    run(
        &tree,
        &["cfg", "v2", "components", "updatemany", "--filter-ids", "a", "--retry-policy", "3"],
    )
    .unwrap();
    assert_eq!(
        last(&recorder).body,
        Some(json!({"filters": {"ids": ["a"]}, "patch": {"retryPolicy": 3}}))
    );

    run(
        &tree,
        &["cfg", "v3", "components", "updatemany", "--filter-ids", "a", "--retry-policy", "3"],
    )
    .unwrap();
    assert_eq!(
        last(&recorder).body,
        Some(json!({"filters": {"ids": ["a"]}, "patch": {"retry_policy": 3}}))
    );
}

#[test]
fn updatemany_merges_explicit_patch_with_typed_options() {
    let (tree, recorder) = build();
    run(
        &tree,
        &[
            "cfg",
            "components",
            "updatemany",
            "--filter-tags",
            "rack=r1",
            "--patch",
            "{\"note\": \"rollout\"}",
            "--error-count",
            "0",
        ],
    )
    .unwrap();
    assert_eq!(
        last(&recorder).body,
        Some(json!({
            "filters": {"tags": {"rack": "r1"}},
            "patch": {"note": "rollout", "errorCount": 0}
        }))
    );
}

#[test]
fn configurations_update_requires_file_or_branches() {
    let (tree, recorder) = build();
    let err = run(&tree, &["cfg", "configurations", "update", "cfg1"]).unwrap_err();
    assert!(err.to_string().contains("--file or --update-branches"));
    assert!(recorder.last_request().is_none());
}

#[test]
fn update_branches_switches_to_patch_with_no_body() {
    let (tree, recorder) = build();
    run(
        &tree,
        &["cfg", "configurations", "update", "cfg1", "--update-branches"],
    )
    .unwrap();
    let request = last(&recorder);
    assert_eq!(request.method, HttpMethod::Patch);
    assert_eq!(request.path, "/apis/cfg/v2/configurations/cfg1");
    assert_eq!(request.body, None);
}

#[test]
fn update_branches_keeps_the_remaining_generated_fields() {
    let (tree, recorder) = build();
    run(
        &tree,
        &[
            "cfg",
            "configurations",
            "update",
            "cfg1",
            "--update-branches",
            "--description",
            "nightly refresh",
        ],
    )
    .unwrap();
    let request = last(&recorder);
    assert_eq!(request.method, HttpMethod::Patch);
    assert_eq!(request.body, Some(json!({"description": "nightly refresh"})));
}

#[test]
fn configuration_file_is_sent_verbatim_with_put() {
    let document = json!({
        "description": "compute image",
        "layers": [{"name": "base", "cloneUrl": "https://git.example.com/base.git"}]
    });
    let path = std::env::temp_dir().join("reefctl-test-configuration.json");
    std::fs::write(&path, document.to_string()).unwrap();

    let (tree, recorder) = build();
    run(
        &tree,
        &[
            "cfg",
            "configurations",
            "update",
            "cfg1",
            "--file",
            path.to_str().unwrap(),
            "--update-branches",
        ],
    )
    .unwrap();
    std::fs::remove_file(&path).ok();

    // --file wins even when --update-branches is also given.
    let request = last(&recorder);
    assert_eq!(request.method, HttpMethod::Put);
    assert_eq!(request.body, Some(document));
}

#[test]
fn unreadable_configuration_file_is_a_usage_error() {
    let (tree, _) = build();
    let err = run(
        &tree,
        &["cfg", "configurations", "update", "cfg1", "--file", "/no/such/file.json"],
    )
    .unwrap_err();
    assert!(matches!(err, CliError::InvalidUsage(_)));
}

#[test]
fn sessions_create_composes_the_target_block() {
    let (tree, recorder) = build();
    run(
        &tree,
        &[
            "cfg",
            "sessions",
            "create",
            "--name",
            "s1",
            "--configuration-name",
            "compute",
            "--target-definition",
            "image",
            "--target-group",
            "g1",
            "a,b",
            "--target-group",
            "g2",
            "c",
            "--image-map",
            "img1",
            "img1-custom",
            "--tags",
            "team=ops",
        ],
    )
    .unwrap();
    let request = last(&recorder);
    assert_eq!(request.method, HttpMethod::Post);
    assert_eq!(request.path, "/apis/cfg/v2/sessions");
    assert_eq!(
        request.body,
        Some(json!({
            "name": "s1",
            "configuration_name": "compute",
            "tags": {"team": "ops"},
            "target": {
                "definition": "image",
                "groups": [
                    {"name": "g1", "members": ["a", "b"]},
                    {"name": "g2", "members": ["c"]}
                ],
                "image_map": [
                    {"source_id": "img1", "result_name": "img1-custom"}
                ]
            }
        }))
    );
}

#[test]
fn sessions_create_defaults_to_empty_target_lists() {
    let (tree, recorder) = build();
    run(&tree, &["cfg", "sessions", "create", "--name", "s1"]).unwrap();
    assert_eq!(
        last(&recorder).body,
        Some(json!({
            "name": "s1",
            "target": {"groups": [], "image_map": []}
        }))
    );
}

#[test]
fn session_status_updates_are_unreachable() {
    let (tree, _) = build();
    assert!(run(&tree, &["cfg", "sessions", "update", "s1"]).is_err());
    assert!(run(&tree, &["cfg", "v2", "sessions", "update", "s1"]).is_err());
    assert!(run(&tree, &["cfg", "v3", "sessions", "update", "s1"]).is_err());
}

#[test]
fn components_update_parses_the_state_document() {
    let (tree, recorder) = build();
    run(
        &tree,
        &[
            "cfg",
            "components",
            "update",
            "node01",
            "--state",
            "{\"commit\": \"abc123\"}",
            "--enabled",
            "false",
            "--tags",
            "rack=r1",
        ],
    )
    .unwrap();
    let request = last(&recorder);
    assert_eq!(request.method, HttpMethod::Patch);
    assert_eq!(request.path, "/apis/cfg/v2/components/node01");
    assert_eq!(
        request.body,
        Some(json!({
            "enabled": false,
            "state": {"commit": "abc123"},
            "tags": {"rack": "r1"}
        }))
    );
}

#[test]
fn components_update_with_no_options_sends_an_empty_patch() {
    let (tree, recorder) = build();
    run(&tree, &["cfg", "components", "update", "node01"]).unwrap();
    assert_eq!(last(&recorder).body, Some(json!({})));
}

#[test]
fn malformed_state_document_is_a_usage_error() {
    let (tree, recorder) = build();
    let err = run(
        &tree,
        &["cfg", "components", "update", "node01", "--state", "not json"],
    )
    .unwrap_err();
    assert!(matches!(err, CliError::InvalidUsage(_)));
    assert!(recorder.last_request().is_none());
}

#[test]
fn source_ids_are_double_encoded() {
    let (tree, recorder) = build();
    run(&tree, &["cfg", "v3", "sources", "describe", "foo/bar"]).unwrap();
    assert_eq!(last(&recorder).path, "/apis/cfg/v3/sources/foo%252Fbar");
}

#[test]
fn plain_source_ids_survive_the_double_encoding() {
    let (tree, recorder) = build();
    run(&tree, &["cfg", "v3", "sources", "delete", "base-image"]).unwrap();
    assert_eq!(last(&recorder).path, "/apis/cfg/v3/sources/base-image");
}

#[test]
fn component_list_filters_land_in_the_query_string() {
    let (tree, recorder) = build();
    run(
        &tree,
        &["cfg", "components", "list", "--status", "failed", "--enabled", "true"],
    )
    .unwrap();
    let request = last(&recorder);
    assert_eq!(request.method, HttpMethod::Get);
    assert_eq!(request.body, None);
    assert!(request.query.contains(&("status".into(), "failed".into())));
    assert!(request.query.contains(&("enabled".into(), "true".into())));
}
