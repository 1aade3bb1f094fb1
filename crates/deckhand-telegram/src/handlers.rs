//! Command handlers.
//!
//! Each handler receives already-authorized, already-split arguments and
//! returns the reply to send. Errors are turned into replies by the router.

use std::path::PathBuf;

use deckhand_process::repo_dir_name;
use tracing::{debug, info, warn};

use crate::command::{CommandId, CommandRegistry};
use crate::error::{CommandError, CommandResult};
use crate::reply::{Menu, MenuButton, Reply};
use crate::state::BotState;

/// Commit message used when deploying pending changes.
pub const DEPLOY_COMMIT_MESSAGE: &str = "Deploy via Telegram Bot";

const GREETING: &str = "Hello! I am your deployment bot. Choose an option:";

/// Who sent a command and with which arguments.
#[derive(Debug, Clone)]
pub struct CommandContext {
    pub user_id: u64,
    pub chat_id: i64,
    pub args: Vec<String>,
}

impl CommandContext {
    fn arg(&self, index: usize) -> CommandResult<&str> {
        self.args
            .get(index)
            .map(|s| s.trim())
            .ok_or_else(|| CommandError::bad_request("Missing argument"))
    }

    /// Last argument with its inner whitespace intact.
    fn raw_arg(&self, index: usize) -> CommandResult<&str> {
        self.args
            .get(index)
            .map(String::as_str)
            .ok_or_else(|| CommandError::bad_request("Missing argument"))
    }
}

/// Run the handler for `id`.
pub async fn execute(
    id: CommandId,
    state: &BotState,
    registry: &CommandRegistry,
    ctx: &CommandContext,
) -> CommandResult<Reply> {
    match id {
        CommandId::Start => Ok(Reply::with_menu(GREETING, start_menu())),
        CommandId::Help => Ok(Reply::text(registry.help_text())),
        CommandId::GithubHelp => Ok(Reply::text(registry.github_help_text())),
        CommandId::SetOpenAi => set_openai(state, ctx).await,
        CommandId::SetHeroku => set_heroku(state, ctx).await,
        CommandId::SetAppName => set_app_name(state, ctx).await,
        CommandId::SetGithub => set_github(state, ctx).await,
        CommandId::Deploy => deploy(state, ctx).await,
        CommandId::Status => status(state, ctx).await,
        CommandId::Logs => logs(state, ctx).await,
        CommandId::Exec => exec(state, ctx).await,
        CommandId::Ai => ai_request(state, ctx.user_id, ctx.raw_arg(0)?).await,
        CommandId::Clone => clone(state, ctx).await,
        CommandId::CreateRepo => create_repo(state, ctx).await,
        CommandId::Commit => commit(state, ctx).await,
        CommandId::Push => push(state, ctx).await,
        CommandId::Pull => pull(state, ctx).await,
        CommandId::ViewFile => view_file(state, ctx).await,
        CommandId::EditFile => edit_file(state, ctx).await,
        CommandId::AddFile => add_file(state, ctx).await,
        CommandId::RemoveFile => remove_file(state, ctx).await,
        CommandId::ListRepos => list_repos(state, ctx).await,
    }
}

/// Inline menu attached to the `/start` greeting.
pub fn start_menu() -> Menu {
    Menu::column([
        MenuButton::new("Heroku Deployment", "deploy"),
        MenuButton::new("Shell Commands", "shell"),
        MenuButton::new("AI", "ai"),
        MenuButton::new("GitHub", "github"),
    ])
}

/// Text that replaces the menu after a button press.
pub fn menu_selection_text(data: &str) -> Option<&'static str> {
    match data {
        "deploy" => Some("You selected Heroku Deployment. Use /help to see available commands."),
        "shell" => Some("You selected Shell Commands. Use /exec <command> to run a command in the workspace."),
        "ai" => Some("You selected AI. Use 'dk ai' followed by your request to interact with AI."),
        "github" => Some("You selected GitHub. Use /github_help to see the GitHub commands."),
        _ => None,
    }
}

// Session settings

async fn set_openai(state: &BotState, ctx: &CommandContext) -> CommandResult<Reply> {
    state.sessions.set_openai_key(ctx.user_id, ctx.arg(0)?).await;
    Ok(Reply::text("OpenAI API key set."))
}

async fn set_heroku(state: &BotState, ctx: &CommandContext) -> CommandResult<Reply> {
    state.sessions.set_heroku_key(ctx.user_id, ctx.arg(0)?).await;
    Ok(Reply::text("Heroku API key set."))
}

async fn set_app_name(state: &BotState, ctx: &CommandContext) -> CommandResult<Reply> {
    let name = ctx.arg(0)?;
    state.sessions.set_app_name(ctx.user_id, name).await;
    Ok(Reply::text(format!("Heroku app name set to {}.", name)))
}

async fn set_github(state: &BotState, ctx: &CommandContext) -> CommandResult<Reply> {
    state.sessions.set_github_token(ctx.user_id, ctx.arg(0)?).await;
    Ok(Reply::text("GitHub token set."))
}

// Heroku

async fn deploy(state: &BotState, ctx: &CommandContext) -> CommandResult<Reply> {
    let (key, app) = state.heroku_target(ctx.user_id).await?;
    let url = ctx.arg(0)?;
    let dir = repo_dir_name(url)
        .ok_or_else(|| CommandError::bad_request(format!("Not a repository URL: {}", url)))?;
    state.ensure_workspace()?;
    let repo = state.workspace.join(&dir);

    info!(user_id = ctx.user_id, app = %app, repo = %dir, "Deploying");
    if repo.is_dir() {
        state.tools.git.pull(&repo).await?;
    } else {
        state.tools.git.clone_repo(url, &repo).await?;
    }

    if state.tools.git.commit_all(&repo, DEPLOY_COMMIT_MESSAGE).await?.is_none() {
        debug!(repo = %dir, "Nothing to commit before deploy");
    }

    // An existing app makes `create` fail; the remote and push still work
    if let Err(e) = state.tools.heroku.create_app(&key, &app, &repo).await {
        warn!(app = %app, error = %e, "Could not create app, assuming it exists");
    }
    state.tools.heroku.set_remote(&key, &app, &repo).await?;
    state.tools.heroku.push(&key, &repo).await?;

    info!(user_id = ctx.user_id, app = %app, "Deployment pushed");
    Ok(Reply::text(format!("Deployment of {} started!", app)))
}

async fn status(state: &BotState, ctx: &CommandContext) -> CommandResult<Reply> {
    let (key, app) = state.heroku_target(ctx.user_id).await?;
    state.ensure_workspace()?;
    let out = state.tools.heroku.status(&key, &app, &state.workspace).await?;
    Ok(Reply::text(format!("Status of {}:\n{}", app, out)))
}

async fn logs(state: &BotState, ctx: &CommandContext) -> CommandResult<Reply> {
    let (key, app) = state.heroku_target(ctx.user_id).await?;
    state.ensure_workspace()?;
    let out = state.tools.heroku.logs(&key, &app, &state.workspace).await?;
    Ok(Reply::text(format!("Logs of {}:\n{}", app, out)))
}

// Shell

async fn exec(state: &BotState, ctx: &CommandContext) -> CommandResult<Reply> {
    let command = ctx.raw_arg(0)?;
    state.ensure_workspace()?;
    let out = state.tools.shell.run(command, &state.workspace).await?;
    if out.trim().is_empty() {
        Ok(Reply::text("Command executed. No output."))
    } else {
        Ok(Reply::text(format!("Command executed. Output:\n{}", out.trim_end())))
    }
}

// AI

/// Answer a free-form AI request.
///
/// `image: <prompt>` generates a picture; anything else goes to the chat
/// model.
pub async fn ai_request(state: &BotState, user_id: u64, request: &str) -> CommandResult<Reply> {
    let request = request.trim();
    if request.is_empty() {
        return Err(CommandError::bad_request(
            "Usage: dk ai <request> or dk ai image: <description>",
        ));
    }
    let key = state.openai_key(user_id).await?;

    if let Some(prompt) = image_prompt(request) {
        if prompt.is_empty() {
            return Err(CommandError::bad_request("Usage: dk ai image: <description>"));
        }
        debug!(user_id, "Generating image");
        let url = state.tools.ai.generate_image(&key, prompt).await?;
        return Ok(Reply::photo(url, Some(prompt.to_string())));
    }

    debug!(user_id, "Requesting chat completion");
    let answer = state.tools.ai.chat_completion(&key, request).await?;
    Ok(Reply::text(format!("🤖 {}", answer)))
}

/// The prompt of an `image:` request, trimmed.
fn image_prompt(request: &str) -> Option<&str> {
    const PREFIX: &str = "image:";
    request
        .get(..PREFIX.len())
        .filter(|p| p.eq_ignore_ascii_case(PREFIX))
        .map(|_| request[PREFIX.len()..].trim())
}

// Local git

fn existing_repo(state: &BotState, relative: &str) -> CommandResult<PathBuf> {
    let path = state.repo_path(relative)?;
    if !path.is_dir() {
        return Err(CommandError::bad_request(format!(
            "No repository at {} in the workspace. Use /clone first.",
            relative
        )));
    }
    Ok(path)
}

async fn clone(state: &BotState, ctx: &CommandContext) -> CommandResult<Reply> {
    let url = ctx.arg(0)?;
    let dir = repo_dir_name(url)
        .ok_or_else(|| CommandError::bad_request(format!("Not a repository URL: {}", url)))?;
    state.ensure_workspace()?;
    let dest = state.workspace.join(&dir);
    if dest.exists() {
        return Err(CommandError::bad_request(format!(
            "{} already exists in the workspace. Use /pull {} instead.",
            dir, dir
        )));
    }

    state.tools.git.clone_repo(url, &dest).await?;
    Ok(Reply::text(format!("Repository cloned successfully into {}.", dir)))
}

async fn commit(state: &BotState, ctx: &CommandContext) -> CommandResult<Reply> {
    let relative = ctx.arg(0)?;
    let message = ctx.raw_arg(1)?;
    let repo = existing_repo(state, relative)?;

    match state.tools.git.commit_all(&repo, message).await? {
        Some(_) => Ok(Reply::text("Changes committed successfully.")),
        None => Ok(Reply::text(format!("Nothing to commit in {}.", relative))),
    }
}

async fn push(state: &BotState, ctx: &CommandContext) -> CommandResult<Reply> {
    let repo = existing_repo(state, ctx.arg(0)?)?;
    state.tools.git.push(&repo).await?;
    Ok(Reply::text("Changes pushed to GitHub successfully."))
}

async fn pull(state: &BotState, ctx: &CommandContext) -> CommandResult<Reply> {
    let repo = existing_repo(state, ctx.arg(0)?)?;
    state.tools.git.pull(&repo).await?;
    Ok(Reply::text("Changes pulled from GitHub successfully."))
}

// GitHub API

async fn create_repo(state: &BotState, ctx: &CommandContext) -> CommandResult<Reply> {
    let token = state.github_token(ctx.user_id).await?;
    let full_name = state.tools.github.create_repository(&token, ctx.arg(0)?).await?;
    Ok(Reply::text(format!("Repository {} created successfully.", full_name)))
}

async fn view_file(state: &BotState, ctx: &CommandContext) -> CommandResult<Reply> {
    let token = state.github_token(ctx.user_id).await?;
    let (repo, path) = (ctx.arg(0)?, ctx.arg(1)?);
    let file = state.tools.github.get_file(&token, repo, path).await?;
    Ok(Reply::text(format!("Content of {}:\n{}", path, file.text())))
}

async fn edit_file(state: &BotState, ctx: &CommandContext) -> CommandResult<Reply> {
    let token = state.github_token(ctx.user_id).await?;
    let (repo, path, content) = (ctx.arg(0)?, ctx.arg(1)?, ctx.raw_arg(2)?);
    let current = state.tools.github.get_file(&token, repo, path).await?;
    let message = format!("Edit {} via Telegram bot", path);
    state
        .tools
        .github
        .put_file(&token, repo, path, content.as_bytes(), &message, Some(&current.sha))
        .await?;
    Ok(Reply::text(format!("File {} edited successfully.", path)))
}

async fn add_file(state: &BotState, ctx: &CommandContext) -> CommandResult<Reply> {
    let token = state.github_token(ctx.user_id).await?;
    let (repo, path, content) = (ctx.arg(0)?, ctx.arg(1)?, ctx.raw_arg(2)?);
    let message = format!("Add {} via Telegram bot", path);
    state
        .tools
        .github
        .put_file(&token, repo, path, content.as_bytes(), &message, None)
        .await?;
    Ok(Reply::text(format!("File {} added successfully.", path)))
}

async fn remove_file(state: &BotState, ctx: &CommandContext) -> CommandResult<Reply> {
    let token = state.github_token(ctx.user_id).await?;
    let (repo, path) = (ctx.arg(0)?, ctx.arg(1)?);
    let current = state.tools.github.get_file(&token, repo, path).await?;
    let message = format!("Remove {} via Telegram bot", path);
    state
        .tools
        .github
        .delete_file(&token, repo, path, &current.sha, &message)
        .await?;
    Ok(Reply::text(format!("File {} removed successfully.", path)))
}

async fn list_repos(state: &BotState, ctx: &CommandContext) -> CommandResult<Reply> {
    let token = state.github_token(ctx.user_id).await?;
    let repos = state.tools.github.list_repositories(&token).await?;
    if repos.is_empty() {
        return Ok(Reply::text("You have no repositories yet."));
    }
    Ok(Reply::text(format!("Your repositories:\n{}", repos.join("\n"))))
}
