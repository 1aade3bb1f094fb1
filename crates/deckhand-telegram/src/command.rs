//! Command table and slash-command parsing.

use std::collections::HashMap;

use teloxide::types::BotCommand;

use crate::error::{CommandError, CommandResult};

/// Identifies the handler behind a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandId {
    Start,
    Help,
    SetOpenAi,
    SetHeroku,
    SetAppName,
    SetGithub,
    Deploy,
    Status,
    Logs,
    Exec,
    Ai,
    GithubHelp,
    Clone,
    CreateRepo,
    Commit,
    Push,
    Pull,
    ViewFile,
    EditFile,
    AddFile,
    RemoveFile,
    ListRepos,
}

/// Who may run a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    OwnerOnly,
    AnyUser,
}

/// Static description of one command.
#[derive(Debug, Clone)]
pub struct CommandSpec {
    /// Name without the leading `/`. Matched case-sensitively.
    pub name: &'static str,
    pub id: CommandId,
    pub access: Access,
    /// Number of positional arguments; the last one keeps its spaces.
    pub arity: usize,
    /// Usage line shown when arguments are missing.
    pub usage: &'static str,
    pub description: &'static str,
}

const fn spec(
    name: &'static str,
    id: CommandId,
    access: Access,
    arity: usize,
    usage: &'static str,
    description: &'static str,
) -> CommandSpec {
    CommandSpec {
        name,
        id,
        access,
        arity,
        usage,
        description,
    }
}

use Access::{AnyUser, OwnerOnly};

const COMMANDS: &[CommandSpec] = &[
    spec("start", CommandId::Start, AnyUser, 0, "/start", "Start the bot and see options"),
    spec("help", CommandId::Help, AnyUser, 0, "/help", "Show available commands"),
    spec("setopenai", CommandId::SetOpenAi, OwnerOnly, 1, "/setopenai <api_key>", "Set the OpenAI API key"),
    spec("setheroku", CommandId::SetHeroku, OwnerOnly, 1, "/setheroku <api_key>", "Set the Heroku API key"),
    spec("setappname", CommandId::SetAppName, OwnerOnly, 1, "/setappname <app_name>", "Set the Heroku app name"),
    spec("setgithub", CommandId::SetGithub, OwnerOnly, 1, "/setgithub <token>", "Set the GitHub token"),
    spec("deploy", CommandId::Deploy, OwnerOnly, 1, "/deploy <repo_url>", "Deploy a repository to Heroku"),
    spec("status", CommandId::Status, OwnerOnly, 0, "/status", "Show the dyno status of the app"),
    spec("logs", CommandId::Logs, OwnerOnly, 0, "/logs", "Show recent Heroku logs"),
    spec("exec", CommandId::Exec, OwnerOnly, 1, "/exec <command>", "Run a shell command in the workspace"),
    spec("ai", CommandId::Ai, OwnerOnly, 1, "/ai <query>", "Ask GPT or generate an image (image: <prompt>)"),
    spec("github_help", CommandId::GithubHelp, OwnerOnly, 0, "/github_help", "Show GitHub commands"),
    spec("clone", CommandId::Clone, OwnerOnly, 1, "/clone <repo_url>", "Clone a GitHub repository"),
    spec("create_repo", CommandId::CreateRepo, OwnerOnly, 1, "/create_repo <repo_name>", "Create a new GitHub repository"),
    spec("commit", CommandId::Commit, OwnerOnly, 2, "/commit <repo_path> <commit_message>", "Commit changes in a repository"),
    spec("push", CommandId::Push, OwnerOnly, 1, "/push <repo_path>", "Push changes to GitHub"),
    spec("pull", CommandId::Pull, OwnerOnly, 1, "/pull <repo_path>", "Pull changes from GitHub"),
    spec("view_file", CommandId::ViewFile, OwnerOnly, 2, "/view_file <repo> <path>", "View a file in a GitHub repository"),
    spec("edit_file", CommandId::EditFile, OwnerOnly, 3, "/edit_file <repo> <path> <content>", "Edit a file in a GitHub repository"),
    spec("add_file", CommandId::AddFile, OwnerOnly, 3, "/add_file <repo> <path> <content>", "Add a new file to a GitHub repository"),
    spec("remove_file", CommandId::RemoveFile, OwnerOnly, 2, "/remove_file <repo> <path>", "Remove a file from a GitHub repository"),
    spec("list_repos", CommandId::ListRepos, OwnerOnly, 0, "/list_repos", "List your repositories"),
];

/// Commands listed by `/github_help` instead of `/help`.
const GITHUB_COMMANDS: &[CommandId] = &[
    CommandId::Clone,
    CommandId::CreateRepo,
    CommandId::Commit,
    CommandId::Push,
    CommandId::Pull,
    CommandId::ViewFile,
    CommandId::EditFile,
    CommandId::AddFile,
    CommandId::RemoveFile,
    CommandId::ListRepos,
];

/// Immutable lookup table of commands, built once at startup.
#[derive(Debug, Clone)]
pub struct CommandRegistry {
    specs: Vec<CommandSpec>,
    by_name: HashMap<&'static str, usize>,
}

impl Default for CommandRegistry {
    fn default() -> Self {
        Self::new(COMMANDS.to_vec())
    }
}

impl CommandRegistry {
    /// Build a registry from `specs`. Later duplicates of a name are ignored.
    pub fn new(specs: Vec<CommandSpec>) -> Self {
        let mut by_name = HashMap::with_capacity(specs.len());
        for (index, spec) in specs.iter().enumerate() {
            by_name.entry(spec.name).or_insert(index);
        }
        Self { specs, by_name }
    }

    pub fn get(&self, name: &str) -> Option<&CommandSpec> {
        self.by_name.get(name).map(|&i| &self.specs[i])
    }

    pub fn by_id(&self, id: CommandId) -> Option<&CommandSpec> {
        self.specs.iter().find(|s| s.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &CommandSpec> {
        self.specs.iter()
    }

    /// `/help` text: every command except the GitHub group.
    pub fn help_text(&self) -> String {
        let mut lines: Vec<String> = self
            .specs
            .iter()
            .filter(|s| !GITHUB_COMMANDS.contains(&s.id))
            .map(|s| format!("{} - {}", s.usage, s.description))
            .collect();
        lines.push("Use /github_help for GitHub commands".to_string());
        lines.join("\n")
    }

    /// `/github_help` text.
    pub fn github_help_text(&self) -> String {
        self.specs
            .iter()
            .filter(|s| GITHUB_COMMANDS.contains(&s.id))
            .map(|s| format!("{} - {}", s.usage, s.description))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Command list for Telegram's command menu.
    pub fn bot_commands(&self) -> Vec<BotCommand> {
        self.specs
            .iter()
            .map(|s| BotCommand::new(s.name, s.description))
            .collect()
    }
}

/// A slash command split off a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlashCommand<'a> {
    /// Command name without `/` and `@bot` suffix.
    pub name: &'a str,
    /// Everything after the whitespace that ended the command token.
    pub rest: &'a str,
}

/// Split `text` into a command name and the remaining text.
///
/// Returns `None` when the text is not a slash command or is addressed to
/// another bot (`/cmd@otherbot`). The mention is compared
/// case-insensitively, as Telegram usernames are.
pub fn parse_slash<'a>(text: &'a str, bot_username: Option<&str>) -> Option<SlashCommand<'a>> {
    let body = text.strip_prefix('/')?;
    let (token, rest) = match body.find(char::is_whitespace) {
        Some(idx) => {
            let ws_len = body[idx..].chars().next().map_or(1, char::len_utf8);
            (&body[..idx], &body[idx + ws_len..])
        }
        None => (body, ""),
    };

    let name = match token.split_once('@') {
        Some((name, mention)) => {
            if let Some(me) = bot_username {
                if !mention.eq_ignore_ascii_case(me.trim_start_matches('@')) {
                    return None;
                }
            }
            name
        }
        None => token,
    };

    if name.is_empty() {
        return None;
    }
    Some(SlashCommand { name, rest })
}

/// Split the text after a command into exactly `spec.arity` arguments.
///
/// Arguments are separated by single spaces; the last argument keeps any
/// remaining spaces. A missing or empty argument is a `BadRequest` carrying
/// the usage line.
pub fn split_args(spec: &CommandSpec, rest: &str) -> CommandResult<Vec<String>> {
    if spec.arity == 0 {
        return Ok(Vec::new());
    }

    let args: Vec<String> = rest.splitn(spec.arity, ' ').map(str::to_string).collect();
    if args.len() < spec.arity || args.iter().any(|a| a.trim().is_empty()) {
        return Err(CommandError::BadRequest(format!("Usage: {}", spec.usage)));
    }
    Ok(args)
}
