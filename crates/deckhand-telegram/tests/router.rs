//! End-to-end routing through fake collaborators.

mod common;

use common::{Harness, Sent, CHAT, OWNER, STRANGER};
use deckhand_telegram::{Incoming, Reply, PERMISSION_DENIED};

#[tokio::test]
async fn test_owner_only_commands_refuse_strangers() {
    let h = Harness::new();
    let attempts = [
        "/setopenai sk-test",
        "/setheroku hk",
        "/setappname demo-app",
        "/setgithub ghp",
        "/deploy https://github.com/octo/demo.git",
        "/status",
        "/logs",
        "/exec ls",
        "/ai hello",
        "/github_help",
        "/clone https://github.com/octo/demo.git",
        "/create_repo demo",
        "/commit demo fix",
        "/push demo",
        "/pull demo",
        "/view_file octo/demo README.md",
        "/edit_file octo/demo README.md hi",
        "/add_file octo/demo README.md hi",
        "/remove_file octo/demo README.md",
        "/list_repos",
    ];

    for text in attempts {
        assert_eq!(h.text(STRANGER, text).await, PERMISSION_DENIED, "{}", text);
    }
    // Even without arguments the refusal comes first
    assert_eq!(h.text(STRANGER, "/deploy").await, PERMISSION_DENIED);

    assert!(h.log.is_empty(), "unexpected calls: {:?}", h.log.calls());
    assert!(h.router.state().sessions.is_empty().await);
}

#[tokio::test]
async fn test_start_and_help_are_public() {
    let h = Harness::new();

    match h.send(STRANGER, "/start").await {
        Some(Reply::Text { text, menu: Some(menu) }) => {
            assert!(text.starts_with("Hello!"));
            let data: Vec<_> = menu.rows.iter().flatten().map(|b| b.data.as_str()).collect();
            assert_eq!(data, ["deploy", "shell", "ai", "github"]);
        }
        other => panic!("unexpected /start reply: {:?}", other),
    }

    let help = h.text(STRANGER, "/help").await;
    assert!(help.contains("/deploy <repo_url>"));
    assert!(help.ends_with("Use /github_help for GitHub commands"));
    assert!(!help.contains("/view_file"));

    let github_help = h.text(OWNER, "/github_help").await;
    assert!(github_help.contains("/view_file <repo> <path>"));
}

#[tokio::test]
async fn test_missing_arguments_reply_with_usage() {
    let h = Harness::new();

    assert_eq!(h.text(OWNER, "/deploy").await, "Usage: /deploy <repo_url>");
    assert_eq!(
        h.text(OWNER, "/commit onlypath").await,
        "Usage: /commit <repo_path> <commit_message>"
    );
    assert_eq!(
        h.text(OWNER, "/edit_file octo/demo README.md").await,
        "Usage: /edit_file <repo> <path> <content>"
    );
    assert_eq!(h.text(OWNER, "/setappname   ").await, "Usage: /setappname <app_name>");

    assert!(h.log.is_empty());
}

#[tokio::test]
async fn test_heroku_commands_need_key_and_app() {
    let h = Harness::new();

    assert_eq!(h.text(OWNER, "/setappname demo-app").await, "Heroku app name set to demo-app.");
    assert_eq!(
        h.text(OWNER, "/status").await,
        "Please set your Heroku API key first using /setheroku."
    );

    let h = Harness::new();
    h.text(OWNER, "/setheroku hk").await;
    assert_eq!(
        h.text(OWNER, "/logs").await,
        "Please set your Heroku app name first using /setappname."
    );

    assert!(h.log.is_empty());
}

#[tokio::test]
async fn test_status_and_logs() {
    let h = Harness::new();
    h.text(OWNER, "/setheroku hk").await;
    h.text(OWNER, "/setappname demo-app").await;

    assert_eq!(
        h.text(OWNER, "/status").await,
        "Status of demo-app:\nweb.1: up 2024/01/01"
    );
    assert_eq!(h.text(OWNER, "/logs").await, "Logs of demo-app:\napp[web.1]: listening");
    assert_eq!(
        h.log.calls(),
        ["heroku ps demo-app key=hk", "heroku logs demo-app key=hk"]
    );
}

#[tokio::test]
async fn test_deploy_clones_then_pulls() {
    let h = Harness::new();
    h.text(OWNER, "/setheroku hk").await;
    h.text(OWNER, "/setappname demo-app").await;

    let url = "https://github.com/octo/demo.git";
    assert_eq!(
        h.text(OWNER, &format!("/deploy {}", url)).await,
        "Deployment of demo-app started!"
    );
    assert_eq!(
        h.log.calls(),
        [
            "git clone https://github.com/octo/demo.git",
            "git commit demo Deploy via Telegram Bot",
            "heroku create demo-app key=hk",
            "heroku git:remote demo-app demo key=hk",
            "heroku push demo key=hk",
        ]
    );
    assert!(h.workspace.join("demo").is_dir());

    // Second deploy reuses the checkout, and an existing app is tolerated
    *h.heroku.fail_create.lock().unwrap() = true;
    *h.git.nothing_to_commit.lock().unwrap() = true;
    assert_eq!(
        h.text(OWNER, &format!("/deploy {}", url)).await,
        "Deployment of demo-app started!"
    );
    assert_eq!(&h.log.calls()[5..], [
        "git pull demo",
        "git commit demo Deploy via Telegram Bot",
        "heroku create demo-app key=hk",
        "heroku git:remote demo-app demo key=hk",
        "heroku push demo key=hk",
    ]);
}

#[tokio::test]
async fn test_exec_reports_output() {
    let h = Harness::new();

    assert_eq!(h.text(OWNER, "/exec echo ok").await, "Command executed. Output:\nok");
    *h.shell.output.lock().unwrap() = "  \n".into();
    assert_eq!(h.text(OWNER, "/exec true").await, "Command executed. No output.");
    assert_eq!(h.log.calls(), ["sh echo ok", "sh true"]);
}

#[tokio::test]
async fn test_local_git_commands() {
    let h = Harness::new();

    assert_eq!(
        h.text(OWNER, "/push demo").await,
        "No repository at demo in the workspace. Use /clone first."
    );
    assert_eq!(
        h.text(OWNER, "/clone https://github.com/octo/demo.git").await,
        "Repository cloned successfully into demo."
    );
    assert_eq!(
        h.text(OWNER, "/clone https://github.com/octo/demo.git").await,
        "demo already exists in the workspace. Use /pull demo instead."
    );
    assert_eq!(
        h.text(OWNER, "/commit demo fix the  typo").await,
        "Changes committed successfully."
    );
    *h.git.nothing_to_commit.lock().unwrap() = true;
    assert_eq!(h.text(OWNER, "/commit demo again").await, "Nothing to commit in demo.");
    assert_eq!(h.text(OWNER, "/push demo").await, "Changes pushed to GitHub successfully.");
    assert_eq!(h.text(OWNER, "/pull demo").await, "Changes pulled from GitHub successfully.");

    assert_eq!(
        h.log.calls(),
        [
            "git clone https://github.com/octo/demo.git",
            "git commit demo fix the  typo",
            "git commit demo again",
            "git push demo",
            "git pull demo",
        ]
    );
}

#[tokio::test]
async fn test_workspace_paths_cannot_escape() {
    let h = Harness::new();

    for text in ["/push ../etc", "/pull /etc", "/commit ../../x msg"] {
        let reply = h.text(OWNER, text).await;
        assert!(reply.starts_with("Path must be relative to the workspace"), "{}", reply);
    }
    assert!(h.log.is_empty());
}

#[tokio::test]
async fn test_github_file_round_trip() {
    let h = Harness::new();
    h.text(OWNER, "/setgithub ghp_owner").await;

    assert_eq!(
        h.text(OWNER, "/add_file octo/demo notes.txt hello  world").await,
        "File notes.txt added successfully."
    );
    assert_eq!(
        h.text(OWNER, "/view_file octo/demo notes.txt").await,
        "Content of notes.txt:\nhello  world"
    );
    assert_eq!(
        h.text(OWNER, "/edit_file octo/demo notes.txt second draft").await,
        "File notes.txt edited successfully."
    );
    assert_eq!(
        h.text(OWNER, "/view_file octo/demo notes.txt").await,
        "Content of notes.txt:\nsecond draft"
    );
    assert_eq!(h.text(OWNER, "/list_repos").await, "Your repositories:\nocto/demo");
    assert_eq!(
        h.text(OWNER, "/remove_file octo/demo notes.txt").await,
        "File notes.txt removed successfully."
    );
    assert_eq!(
        h.text(OWNER, "/view_file octo/demo notes.txt").await,
        "❌ Not found: notes.txt in octo/demo"
    );
    assert_eq!(h.text(OWNER, "/list_repos").await, "You have no repositories yet.");

    let calls = h.log.calls();
    assert!(calls.iter().all(|c| c.ends_with("token=ghp_owner")), "{:?}", calls);
    assert!(calls.contains(&"github put octo/demo notes.txt sha=sha1 message=Edit notes.txt via Telegram bot token=ghp_owner".to_string()));
    assert!(calls.contains(&"github delete octo/demo notes.txt sha=sha2 message=Remove notes.txt via Telegram bot token=ghp_owner".to_string()));
}

#[tokio::test]
async fn test_github_needs_a_token() {
    let h = Harness::new();
    assert_eq!(
        h.text(OWNER, "/list_repos").await,
        "🔒 No GitHub token configured. Set one with /setgithub."
    );
    assert!(h.log.is_empty());

    let h = Harness::builder().github_fallback("ghp_env").build();
    assert_eq!(
        h.text(OWNER, "/create_repo demo").await,
        "Repository octo/demo created successfully."
    );
    h.text(OWNER, "/setgithub ghp_session").await;
    h.text(OWNER, "/list_repos").await;
    assert_eq!(
        h.log.calls(),
        ["github create demo token=ghp_env", "github list token=ghp_session"]
    );
}

#[tokio::test]
async fn test_ai_trigger_generates_image() {
    let h = Harness::new();
    h.text(OWNER, "/setopenai sk-owner").await;

    let reply = h.send(OWNER, "dk ai image: a red bicycle").await;
    assert_eq!(
        reply,
        Some(Reply::photo(
            "https://img.example.com/generated.png",
            Some("a red bicycle".to_string())
        ))
    );
    assert_eq!(h.log.calls(), ["ai image key=sk-owner prompt=a red bicycle"]);
}

#[tokio::test]
async fn test_ai_trigger_chat() {
    let h = Harness::builder().openai_fallback("sk-env").build();

    assert_eq!(
        h.text(OWNER, "hey DK AI what is rust?").await,
        "🤖 answer to hey  what is rust?"
    );
    assert_eq!(h.text(OWNER, "/ai  two  spaces").await, "🤖 answer to two  spaces");
    assert_eq!(
        h.log.calls(),
        [
            "ai chat key=sk-env prompt=hey  what is rust?",
            "ai chat key=sk-env prompt=two  spaces",
        ]
    );

    *h.ai.fail_with.lock().unwrap() = Some("quota exceeded".into());
    assert_eq!(h.text(OWNER, "dk ai again").await, "❌ OpenAI error: quota exceeded");
}

#[tokio::test]
async fn test_unknown_command_falls_through_to_ai_trigger() {
    let h = Harness::builder().openai_fallback("sk-env").build();

    assert_eq!(
        h.text(OWNER, "/frobnicate dk ai hi").await,
        "🤖 answer to /frobnicate  hi"
    );
    assert_eq!(h.log.calls(), ["ai chat key=sk-env prompt=/frobnicate  hi"]);

    // A known command wins over the trigger
    assert_eq!(h.text(OWNER, "/setappname dk ai").await, "Heroku app name set to dk ai.");
    assert_eq!(h.log.calls().len(), 1);
    // Strangers get neither
    assert_eq!(h.send(STRANGER, "/frobnicate dk ai hi").await, None);
}

#[tokio::test]
async fn test_ai_needs_a_key() {
    let h = Harness::new();
    assert_eq!(
        h.text(OWNER, "dk ai hello").await,
        "Please set your OpenAI API key first using /setopenai."
    );
    assert!(h.log.is_empty());
}

#[tokio::test]
async fn test_ignored_messages() {
    let h = Harness::builder().bot_username("deckhand_bot").build();

    // Unknown commands and plain chatter get no reply
    assert_eq!(h.send(OWNER, "/frobnicate now").await, None);
    assert_eq!(h.send(OWNER, "hello there").await, None);
    // Non-owners cannot use the AI trigger
    assert_eq!(h.send(STRANGER, "dk ai hello").await, None);
    // Commands for other bots in a group
    assert_eq!(h.send(OWNER, "/status@otherbot").await, None);
    assert_eq!(
        h.text(OWNER, "/help@DeckHand_Bot").await,
        h.text(OWNER, "/help").await
    );

    assert!(h.log.is_empty());
}

#[tokio::test]
async fn test_dispatch_delivers_one_reply() {
    let h = Harness::new();

    h.router.dispatch(Incoming::new(OWNER, CHAT, "/setheroku hk")).await;
    h.router.dispatch(Incoming::new(STRANGER, CHAT + 1, "hello")).await;

    assert_eq!(
        h.transport.sent(),
        [Sent::Text {
            chat_id: CHAT,
            text: "Heroku API key set.".into(),
            menu: None,
        }]
    );
}

#[tokio::test]
async fn test_long_replies_are_truncated() {
    let h = Harness::new();
    *h.shell.output.lock().unwrap() = "x".repeat(10_000);

    h.router.dispatch(Incoming::new(OWNER, CHAT, "/exec yes")).await;

    match h.transport.sent().as_slice() {
        [Sent::Text { text, .. }] => {
            assert!(text.encode_utf16().count() <= 4096);
            assert!(text.starts_with("Command executed. Output:\nxxx"));
            assert!(text.ends_with("more characters)"));
        }
        other => panic!("unexpected delivery: {:?}", other),
    }
}

#[tokio::test]
async fn test_emoji_replies_fit_the_message_limit() {
    let h = Harness::new();
    *h.shell.output.lock().unwrap() = "😀".repeat(5000);

    h.router.dispatch(Incoming::new(OWNER, CHAT, "/exec emoji")).await;

    match h.transport.sent().as_slice() {
        [Sent::Text { text, .. }] => {
            assert!(text.encode_utf16().count() <= 4096);
            assert!(text.starts_with("Command executed. Output:\n😀"));
            assert!(text.ends_with("more characters)"));
        }
        other => panic!("unexpected delivery: {:?}", other),
    }
}
