//! CLI argument definitions

use crate::logging::LogFormat;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Top-level arguments
#[derive(Debug, Parser)]
#[command(
    name = "ems-console",
    version,
    about = "Emergency-management console: search, export, notify and archive records"
)]
pub struct Cli {
    /// Action to run.
    #[command(subcommand)]
    pub command: Command,

    /// TOML config file (defaults apply when omitted).
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Log output format.
    #[arg(long = "log-format", value_enum, default_value = "pretty", global = true)]
    pub log_format: LogFormat,
}

/// Console subcommands
#[derive(Debug, Subcommand)]
pub enum Command {
    /// List one page of a resource.
    Search(SearchArgs),

    /// Download selected records.
    Export(ExportArgs),

    /// Share selected records as a notification.
    Notify(NotifyArgs),

    /// Delete records after confirmation.
    Archive(ArchiveArgs),

    /// Resolve reference options the way a filter field does.
    Lookup(LookupArgs),
}

/// `search` arguments
#[derive(Debug, Args)]
pub struct SearchArgs {
    /// Resource name, e.g. `incidents`.
    pub resource: String,

    /// Free-text query.
    #[arg(short, long)]
    pub query: Option<String>,

    /// Page number.
    #[arg(long, default_value_t = 1)]
    pub page: u32,

    /// Page size (server default when omitted).
    #[arg(long = "per-page")]
    pub per_page: Option<u32>,

    /// Print records as JSON lines.
    #[arg(long)]
    pub json: bool,
}

/// `export` arguments
#[derive(Debug, Args)]
pub struct ExportArgs {
    /// Resource name.
    pub resource: String,

    /// Record ids to export.
    #[arg(long, value_delimiter = ',', required = true)]
    pub ids: Vec<String>,

    /// Output path (defaults to the server-provided file name).
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,
}

/// `notify` arguments
#[derive(Debug, Args)]
pub struct NotifyArgs {
    /// Resource holding the records to share.
    pub resource: String,

    /// Records to share.
    #[arg(long, value_delimiter = ',', required = true)]
    pub ids: Vec<String>,

    /// Delivery channel (SMS, EMAIL, PUSH); repeatable. Config defaults when omitted.
    #[arg(long = "channel", value_delimiter = ',')]
    pub channels: Vec<String>,

    /// Subject line.
    #[arg(long)]
    pub subject: String,

    /// Per-record text with `{field}` placeholders.
    #[arg(long, default_value = "{id}")]
    pub template: String,

    /// Explicit recipient ids.
    #[arg(long = "recipient", value_delimiter = ',')]
    pub recipients: Vec<String>,

    /// Recipient groups.
    #[arg(long = "group", value_delimiter = ',')]
    pub groups: Vec<String>,

    /// Recipient roles.
    #[arg(long = "role", value_delimiter = ',')]
    pub roles: Vec<String>,

    /// Recipient areas.
    #[arg(long = "area", value_delimiter = ',')]
    pub areas: Vec<String>,
}

/// `archive` arguments
#[derive(Debug, Args)]
pub struct ArchiveArgs {
    /// Resource name.
    pub resource: String,

    /// Records to archive.
    #[arg(required = true)]
    pub ids: Vec<String>,

    /// Skip the confirmation prompt.
    #[arg(short, long)]
    pub yes: bool,
}

/// `lookup` arguments
#[derive(Debug, Args)]
pub struct LookupArgs {
    /// Referenced resource, e.g. `areas`.
    pub resource: String,

    /// Search text; the open search runs when omitted.
    #[arg(short, long)]
    pub query: Option<String>,

    /// Record field used as the option label.
    #[arg(long, default_value = "name")]
    pub label: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn notify_splits_lists() {
        let cli = Cli::parse_from([
            "ems-console",
            "notify",
            "incidents",
            "--ids",
            "1,2",
            "--channel",
            "SMS,EMAIL",
            "--subject",
            "Update",
            "--group",
            "responders",
        ]);
        let Command::Notify(args) = cli.command else {
            panic!("expected notify");
        };
        assert_eq!(args.ids, ["1", "2"]);
        assert_eq!(args.channels, ["SMS", "EMAIL"]);
        assert_eq!(args.template, "{id}");
        assert_eq!(args.groups, ["responders"]);
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::parse_from(["ems-console", "archive", "events", "7", "-vv", "--yes"]);
        assert_eq!(cli.verbose, 2);
        assert!(matches!(cli.command, Command::Archive(ArchiveArgs { yes: true, .. })));
    }

    #[test]
    fn lookup_defaults_to_name_label() {
        let cli = Cli::parse_from(["ems-console", "lookup", "areas", "-q", "nor"]);
        let Command::Lookup(args) = cli.command else {
            panic!("expected lookup");
        };
        assert_eq!(args.resource, "areas");
        assert_eq!(args.query.as_deref(), Some("nor"));
        assert_eq!(args.label, "name");
    }
}
