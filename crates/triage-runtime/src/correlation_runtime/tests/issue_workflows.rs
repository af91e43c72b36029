use super::*;

/// Covers the new-issue state machine and the existing-issue comment path.

#[tokio::test]
async fn integration_create_press_offers_ephemeral_repository_picker() {
    let discord = MockServer::start();
    let github = MockServer::start();
    let temp = tempdir().expect("tempdir");
    let mut runtime = test_runtime(&discord, &github, temp.path()).await;

    let callback = discord.mock(|when, then| {
        when.method(POST)
            .path("/interactions/i1/tok/callback")
            .body_includes("\"type\":4")
            .body_includes("\"flags\":64")
            .body_includes("tri1:repo:bug:m2")
            .body_includes("backend")
            .body_includes("frontend");
        then.status(204);
    });

    runtime
        .handle_interaction(button_interaction("tri1:create:bug:m2", "chan-report"))
        .await
        .expect("create press");
    assert_eq!(callback.calls(), 1);
}

#[tokio::test]
async fn integration_repository_selection_offers_confirm_button() {
    let discord = MockServer::start();
    let github = MockServer::start();
    let temp = tempdir().expect("tempdir");
    let mut runtime = test_runtime(&discord, &github, temp.path()).await;

    let callback = discord.mock(|when, then| {
        when.method(POST)
            .path("/interactions/i1/tok/callback")
            .body_includes("\"type\":7")
            .body_includes("tri1:confirm:bug:backend:m2")
            .body_includes("You selected **backend**");
        then.status(204);
    });

    runtime
        .handle_interaction(select_interaction("tri1:repo:bug:m2", "backend", "chan-report"))
        .await
        .expect("repository selection");
    assert_eq!(callback.calls(), 1);
}

#[tokio::test]
async fn regression_selecting_unlisted_repository_does_not_offer_confirm() {
    let discord = MockServer::start();
    let github = MockServer::start();
    let temp = tempdir().expect("tempdir");
    let mut runtime = test_runtime(&discord, &github, temp.path()).await;

    let callback = discord.mock(|when, then| {
        when.method(POST)
            .path("/interactions/i1/tok/callback")
            .body_includes("not on the allow-list");
        then.status(204);
    });

    runtime
        .handle_interaction(select_interaction("tri1:repo:bug:m2", "sneaky-repo", "chan-report"))
        .await
        .expect("unlisted repository is refused");
    assert_eq!(callback.calls(), 1);
}

fn mock_card_fetch(discord: &MockServer) -> httpmock::Mock<'_> {
    discord.mock(|when, then| {
        when.method(GET).path("/channels/chan-report/messages/m2");
        then.status(200).json_body(json!({
            "id": "m2",
            "channel_id": "chan-report",
            "embeds": [{
                "title": "New bug report / feature request",
                "description": "App crashes on save every time",
                "color": 5793266,
                "author": {"name": "Reporter Prime"},
            }],
            "components": [{
                "type": 1,
                "components": [
                    {"type": 2, "style": 4, "label": "Create bug issue", "custom_id": "tri1:create:bug:m2"},
                    {"type": 2, "style": 1, "label": "Create feature issue", "custom_id": "tri1:create:feature:m2"},
                ],
            }],
            "message_reference": {"message_id": "m1", "channel_id": "chan-report"},
            "thread": {"id": "t1", "name": "Discussion: Reporter Prime's report"},
        }));
    })
}

#[tokio::test]
async fn integration_confirm_creates_issue_persists_link_and_updates_chat() {
    let discord = MockServer::start();
    let github = MockServer::start();
    let temp = tempdir().expect("tempdir");
    let mut runtime = test_runtime(&discord, &github, temp.path()).await;

    let fetch_card = mock_card_fetch(&discord);
    let fetch_original = discord.mock(|when, then| {
        when.method(GET).path("/channels/chan-report/messages/m1");
        then.status(200).json_body(json!({
            "id": "m1",
            "channel_id": "chan-report",
            "author": {"id": "u1", "username": "reporter", "global_name": "Reporter Prime"},
            "content": "App crashes on save every time",
        }));
    });
    let create_issue = github.mock(|when, then| {
        when.method(POST)
            .path("/repos/acme/backend/issues")
            .body_includes("\"title\":\"Bug: App crashes on save every time\"")
            .body_includes("\"labels\":[\"bug\"]")
            .body_includes("**Reported by:** Reporter Prime")
            .body_includes("https://discord.com/channels/g1/chan-report/m1");
        then.status(201).json_body(json!({
            "number": 42,
            "title": "Bug: App crashes on save every time",
            "html_url": "https://github.test/acme/backend/issues/42",
            "state": "open",
            "labels": [{"name": "bug"}],
        }));
    });
    let ack = discord.mock(|when, then| {
        when.method(POST)
            .path("/interactions/i1/tok/callback")
            .body_includes("\"type\":7")
            .body_includes("#42");
        then.status(204);
    });
    let terminalize_card = discord.mock(|when, then| {
        when.method(PATCH)
            .path("/channels/chan-report/messages/m2")
            .body_includes("\"disabled\":true")
            .body_includes("Linked tracker issue");
        then.status(200)
            .json_body(json!({"id": "m2", "channel_id": "chan-report"}));
    });
    let rename_thread = discord.mock(|when, then| {
        when.method(PATCH)
            .path("/channels/t1")
            .body_includes("Issue #42");
        then.status(200)
            .json_body(json!({"id": "t1", "name": "Issue #42 — App crashes on save every"}));
    });
    let announce = discord.mock(|when, then| {
        when.method(POST)
            .path("/channels/t1/messages")
            .body_includes("<@u1>")
            .body_includes("#42");
        then.status(200)
            .json_body(json!({"id": "m9", "channel_id": "t1"}));
    });

    runtime
        .handle_interaction(button_interaction(
            "tri1:confirm:bug:backend:m2",
            "chan-report",
        ))
        .await
        .expect("confirm succeeds");

    assert_eq!(fetch_card.calls(), 1);
    assert_eq!(fetch_original.calls(), 1);
    assert_eq!(create_issue.calls(), 1);
    assert_eq!(ack.calls(), 1);
    assert_eq!(terminalize_card.calls(), 1);
    assert_eq!(rename_thread.calls(), 1);
    assert_eq!(announce.calls(), 1);

    let link = runtime.store.link("m2").expect("card is linked");
    assert_eq!(link.issue.number, 42);
    assert_eq!(link.issue.owner, "acme");
    assert_eq!(link.issue.repo, "backend");
    assert_eq!(link.issue.labels, vec!["bug".to_string()]);
    assert!(!link.issue.closed);
    assert_eq!(link.report.author_id, "u1");
    assert_eq!(link.report.message_id, "m1");
    assert_eq!(link.report.kind, ReportKind::Bug);
    let thread = link.thread.as_ref().expect("thread attached");
    assert_eq!(thread.thread_id, "t1");
    assert!(thread.name.contains("Issue #42"));
}

#[tokio::test]
async fn regression_repeated_confirm_never_files_a_second_issue() {
    let discord = MockServer::start();
    let github = MockServer::start();
    let temp = tempdir().expect("tempdir");
    let mut runtime = test_runtime(&discord, &github, temp.path()).await;
    seed_link(&mut runtime, "m2", 42, Some("t1"));

    let create_issue = github.mock(|when, then| {
        when.method(POST).path("/repos/acme/backend/issues");
        then.status(201).json_body(json!({
            "number": 43,
            "title": "should never exist",
            "html_url": "https://github.test/acme/backend/issues/43",
            "state": "open",
        }));
    });
    let already_linked = discord.mock(|when, then| {
        when.method(POST)
            .path("/interactions/i1/tok/callback")
            .body_includes("already linked")
            .body_includes("#42");
        then.status(204);
    });

    for _ in 0..3 {
        runtime
            .handle_interaction(button_interaction(
                "tri1:confirm:bug:backend:m2",
                "chan-report",
            ))
            .await
            .expect("re-confirm is acknowledged, not re-filed");
    }

    assert_eq!(create_issue.calls(), 0);
    assert_eq!(already_linked.calls(), 3);
    assert_eq!(runtime.store.link_count(), 1);
    assert_eq!(runtime.store.link("m2").expect("link").issue.number, 42);
}

#[tokio::test]
async fn functional_context_command_in_linked_thread_offers_direct_comment() {
    let discord = MockServer::start();
    let github = MockServer::start();
    let temp = tempdir().expect("tempdir");
    let mut runtime = test_runtime(&discord, &github, temp.path()).await;
    seed_link(&mut runtime, "m2", 42, Some("t1"));

    let callback = discord.mock(|when, then| {
        when.method(POST)
            .path("/interactions/i1/tok/callback")
            .body_includes("linked to tracker issue #42")
            .body_includes("tri1:comment:backend:42:m5");
        then.status(204);
    });

    let target = message_from_json(json!({
        "id": "m5",
        "channel_id": "t1",
        "content": "still broken after the patch",
    }));
    runtime
        .handle_interaction(context_interaction("Link to Tracker Issue", "t1", target))
        .await
        .expect("context command in linked thread");
    assert_eq!(callback.calls(), 1);
}

#[tokio::test]
async fn functional_context_command_elsewhere_lists_open_issues() {
    let discord = MockServer::start();
    let github = MockServer::start();
    let temp = tempdir().expect("tempdir");
    let mut runtime = test_runtime(&discord, &github, temp.path()).await;

    let backend_issues = github.mock(|when, then| {
        when.method(GET)
            .path("/repos/acme/backend/issues")
            .query_param("state", "open");
        then.status(200).json_body(json!([{
            "number": 11,
            "title": "Saving corrupts the index",
            "html_url": "https://github.test/acme/backend/issues/11",
            "state": "open",
        }]));
    });
    let frontend_issues = github.mock(|when, then| {
        when.method(GET)
            .path("/repos/acme/frontend/issues")
            .query_param("state", "open");
        then.status(200).json_body(json!([]));
    });
    let callback = discord.mock(|when, then| {
        when.method(POST)
            .path("/interactions/i1/tok/callback")
            .body_includes("tri1:pick:m5")
            .body_includes("#11 Saving corrupts the index")
            .body_includes("backend#11");
        then.status(204);
    });

    let target = message_from_json(json!({
        "id": "m5",
        "channel_id": "chan-help",
        "content": "saving still corrupts things for me",
    }));
    runtime
        .handle_interaction(context_interaction(
            "Link to Tracker Issue",
            "chan-help",
            target,
        ))
        .await
        .expect("context command lists open issues");

    assert_eq!(backend_issues.calls(), 1);
    assert_eq!(frontend_issues.calls(), 1);
    assert_eq!(callback.calls(), 1);
}

#[tokio::test]
async fn integration_comment_confirm_relays_message_text_to_tracker() {
    let discord = MockServer::start();
    let github = MockServer::start();
    let temp = tempdir().expect("tempdir");
    let mut runtime = test_runtime(&discord, &github, temp.path()).await;

    let fetch_message = discord.mock(|when, then| {
        when.method(GET).path("/channels/t1/messages/m5");
        then.status(200).json_body(json!({
            "id": "m5",
            "channel_id": "t1",
            "author": {"id": "u2", "username": "helper"},
            "content": "still broken after the patch",
        }));
    });
    let create_comment = github.mock(|when, then| {
        when.method(POST)
            .path("/repos/acme/backend/issues/42/comments")
            .body_includes("still broken after the patch")
            .body_includes("helper");
        then.status(201).json_body(json!({"id": 900}));
    });
    // The acknowledgment is a link-free confirmation string.
    let ack = discord.mock(|when, then| {
        when.method(POST)
            .path("/interactions/i1/tok/callback")
            .body_includes("Comment added to issue #42.");
        then.status(204);
    });

    runtime
        .handle_interaction(button_interaction("tri1:comment:backend:42:m5", "t1"))
        .await
        .expect("comment confirm");

    assert_eq!(fetch_message.calls(), 1);
    assert_eq!(create_comment.calls(), 1);
    assert_eq!(ack.calls(), 1);
}

#[tokio::test]
async fn regression_comment_confirm_acknowledges_tracker_failure() {
    let discord = MockServer::start();
    let github = MockServer::start();
    let temp = tempdir().expect("tempdir");
    let mut runtime = test_runtime(&discord, &github, temp.path()).await;

    discord.mock(|when, then| {
        when.method(GET).path("/channels/t1/messages/m5");
        then.status(200).json_body(json!({
            "id": "m5",
            "channel_id": "t1",
            "author": {"id": "u2", "username": "helper"},
            "content": "still broken after the patch",
        }));
    });
    let create_comment = github.mock(|when, then| {
        when.method(POST).path("/repos/acme/backend/issues/42/comments");
        then.status(404).body("{\"message\": \"Not Found\"}");
    });
    let failure_ack = discord.mock(|when, then| {
        when.method(POST)
            .path("/interactions/i1/tok/callback")
            .body_includes("Could not add the comment");
        then.status(204);
    });

    runtime
        .handle_interaction(button_interaction("tri1:comment:backend:42:m5", "t1"))
        .await
        .expect("failure is acknowledged, not propagated");

    assert_eq!(create_comment.calls(), 1);
    assert_eq!(failure_ack.calls(), 1);
}
