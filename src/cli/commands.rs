//! Command dispatch: one handler per subcommand.

use std::io;
use std::path::Path;

use clap::CommandFactory;
use clap_complete::generate;
use tracing::{debug, instrument};

use crate::cli::args::{Cli, Commands, ConfigCommands};
use crate::cli::error::{CliError, CliResult};
use crate::cli::output;
use crate::cli::tree_view::TreeNodeConvert;
use crate::config::{global_config_path, Settings};
use crate::domain::{EntryDraft, EntryId, Extent, VoteDirection};
use crate::infrastructure::di::ServiceContainer;

pub fn execute_command(cli: &Cli) -> CliResult<()> {
    match &cli.command {
        Some(Commands::Show {
            root,
            depth_one,
            viewer,
        }) => _show(cli, EntryId(*root), *depth_one, *viewer),
        Some(Commands::Post {
            parent,
            title,
            body,
            url,
            author,
        }) => _post(
            cli,
            parent.map(EntryId),
            title.clone(),
            body.as_deref(),
            url.as_deref(),
            *author,
        ),
        Some(Commands::Vote {
            entry,
            user,
            up,
            down,
            clear: _,
        }) => _vote(cli, EntryId(*entry), *user, direction(*up, *down)),
        Some(Commands::Config { command }) => _config(cli, command),
        Some(Commands::Completion { shell }) => {
            let mut cmd = Cli::command();
            let name = cmd.get_name().to_string();
            generate(*shell, &mut cmd, name, &mut io::stdout());
            Ok(())
        }
        None => Err(CliError::Usage(
            "no command given, see --help".to_string(),
        )),
    }
}

fn direction(up: bool, down: bool) -> VoteDirection {
    match (up, down) {
        (true, _) => VoteDirection::Up,
        (_, true) => VoteDirection::Down,
        _ => VoteDirection::None,
    }
}

/// Settings from config layers, with `--snapshot` taking precedence.
fn load_settings(cli: &Cli) -> CliResult<Settings> {
    let mut settings = Settings::load(cli.config.as_deref())?;
    if let Some(path) = &cli.snapshot {
        settings.snapshot_path = path.clone();
    }
    Ok(settings)
}

fn container(cli: &Cli) -> CliResult<ServiceContainer> {
    Ok(ServiceContainer::new(load_settings(cli)?)?)
}

#[instrument(skip(cli))]
fn _show(cli: &Cli, root: EntryId, depth_one: bool, viewer: Option<i64>) -> CliResult<()> {
    let container = container(cli)?;
    let extent = if depth_one {
        Extent::DepthOne
    } else {
        Extent::AllDescendants
    };
    let viewer = viewer.or(container.settings.viewer);
    let thread = container
        .thread_service()
        .ranked_thread(root, extent, viewer)?;
    debug!("report: {:?}", thread.report);
    output::info(&thread.to_tree_string());
    Ok(())
}

#[instrument(skip(cli, body, url))]
fn _post(
    cli: &Cli,
    parent: Option<EntryId>,
    title: Option<String>,
    body: Option<&str>,
    url: Option<&str>,
    author: i64,
) -> CliResult<()> {
    let draft = match (body, url) {
        (Some(text), None) => EntryDraft::text(title, text),
        (None, Some(link)) => EntryDraft::link(title, link),
        _ => {
            return Err(CliError::InvalidArgs(
                "exactly one of --body or --url is required".to_string(),
            ))
        }
    };
    let container = container(cli)?;
    let entry = container.thread_service().post(parent, draft, author)?;
    output::success(&format!("created entry {}: {}", entry.id, entry.label()));
    Ok(())
}

#[instrument(skip(cli))]
fn _vote(cli: &Cli, entry: EntryId, user: i64, direction: VoteDirection) -> CliResult<()> {
    let container = container(cli)?;
    let service = container.thread_service();
    let previous = service.find_vote(entry, user)?;
    let vote = service.vote(entry, user, direction)?;
    let label = match vote.direction {
        VoteDirection::Up => "upvoted",
        VoteDirection::Down => "downvoted",
        VoteDirection::None => "cleared vote on",
    };
    output::success(&format!("user {} {} entry {}", user, label, entry));
    if let Some(previous) = previous.filter(|p| p.direction != vote.direction) {
        output::detail(&format!("was {:?}", previous.direction));
    }
    Ok(())
}

fn _config(cli: &Cli, command: &ConfigCommands) -> CliResult<()> {
    match command {
        ConfigCommands::Show => {
            let settings = load_settings(cli)?;
            output::info(&settings.to_toml()?);
        }
        ConfigCommands::Path => {
            output::header("Config paths");
            match global_config_path() {
                Some(path) => output::detail(&format!("global: {}", describe(&path))),
                None => output::detail(&"global: (no home directory)"),
            }
            if let Some(path) = &cli.config {
                output::detail(&format!("explicit: {}", describe(path)));
            }
            let settings = load_settings(cli)?;
            output::detail(&format!(
                "snapshot: {}",
                describe(&settings.snapshot_path)
            ));
        }
    }
    Ok(())
}

fn describe(path: &Path) -> String {
    if path.exists() {
        path.display().to_string()
    } else {
        format!("{} (not found)", path.display())
    }
}
