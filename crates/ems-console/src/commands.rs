//! Subcommand handlers

use crate::cli::{ArchiveArgs, Command, ExportArgs, LookupArgs, NotifyArgs, SearchArgs};
use crate::config::ConsoleConfig;
use crate::list_view::ListView;
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use ems_dispatch::{
    ActionOutcome, AutoConfirm, BulkActionDispatcher, Confirm, FieldTemplate, ShareTarget, Toast,
    ToastLevel, Toaster,
};
use ems_reference::{LabelSource, SearchOutcome, Seed};
use ems_resolver::{
    parse_channels, HttpResolver, RecipientCriteria, Record, RecordId, RemoteResolver,
};
use std::collections::HashSet;
use std::io::{BufRead, Write};
use std::sync::Arc;

/// Upper bound on pages scanned when collecting records by id
const MAX_SCAN_PAGES: u32 = 50;

/// Prints toasts to stderr
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleToaster;

impl Toaster for ConsoleToaster {
    fn show(&self, toast: Toast) {
        let tag = match toast.level {
            ToastLevel::Success => "ok",
            ToastLevel::Info => "info",
            ToastLevel::Error => "error",
        };
        eprintln!("[{tag}] {}", toast.message);
    }
}

/// Asks on the terminal
#[derive(Debug, Clone, Copy, Default)]
pub struct StdinConfirm;

#[async_trait]
impl Confirm for StdinConfirm {
    async fn confirm(&self, prompt: &str) -> bool {
        let prompt = prompt.to_string();
        let answer = tokio::task::spawn_blocking(move || {
            eprint!("{prompt} [y/N] ");
            std::io::stderr().flush().ok();
            let mut line = String::new();
            std::io::stdin().lock().read_line(&mut line).ok();
            line
        })
        .await
        .unwrap_or_default();
        matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
    }
}

/// Run one subcommand
///
/// # Errors
/// Fails on bad input, unreachable API, or a failed action.
pub async fn run(command: Command, config: &ConsoleConfig) -> Result<()> {
    match command {
        Command::Search(args) => search(args, config).await,
        Command::Export(args) => export(args, config).await,
        Command::Notify(args) => notify(args, config).await,
        Command::Archive(args) => archive(args, config).await,
        Command::Lookup(args) => lookup(args, config).await,
    }
}

fn resolver(config: &ConsoleConfig, resource: &str) -> Result<Arc<dyn RemoteResolver>> {
    let http = HttpResolver::new(&config.resolver.base_url, resource, config.timeout())
        .with_context(|| format!("creating client for {}", config.resolver.base_url))?;
    Ok(Arc::new(http))
}

fn dispatcher(config: &ConsoleConfig, resolver: Arc<dyn RemoteResolver>) -> BulkActionDispatcher {
    BulkActionDispatcher::new(resolver, Arc::new(ConsoleToaster))
        .with_config(config.dispatch.clone())
}

fn record_ids(ids: Vec<String>) -> Vec<RecordId> {
    ids.into_iter().map(RecordId::from).collect()
}

fn finish<T>(outcome: ActionOutcome<T>) -> Result<T> {
    match outcome {
        ActionOutcome::Succeeded(value) => Ok(value),
        ActionOutcome::Failed(err) => Err(err.into()),
        ActionOutcome::Cancelled => bail!("cancelled"),
    }
}

async fn search(args: SearchArgs, config: &ConsoleConfig) -> Result<()> {
    let remote = resolver(config, &args.resource)?;
    let mut view: ListView =
        ListView::new(remote.clone(), dispatcher(config, remote)).with_query(args.query);
    if let Some(per_page) = args.per_page {
        view = view.with_per_page(per_page);
    }
    let page = view.load_page(args.page).await?;

    let mut out = std::io::stdout().lock();
    for record in &page.items {
        if args.json {
            writeln!(out, "{}", record.to_value())?;
        } else {
            let label = record
                .field_text("name")
                .or_else(|| record.field_text("title"))
                .unwrap_or_default();
            writeln!(out, "{}\t{}", record.id, label)?;
        }
    }
    if let Some(total) = page.total {
        writeln!(out, "-- page {} ({} rows, {} total)", page.number, page.items.len(), total)?;
    }
    Ok(())
}

async fn export(args: ExportArgs, config: &ConsoleConfig) -> Result<()> {
    let remote = resolver(config, &args.resource)?;
    let artifact = finish(dispatcher(config, remote).export(record_ids(args.ids)).await)?;

    let path = args.output.unwrap_or_else(|| artifact.file_name.clone().into());
    std::fs::write(&path, &artifact.bytes)
        .with_context(|| format!("writing {}", path.display()))?;
    println!("{}", path.display());
    Ok(())
}

/// Page through the resource selecting the wanted records
async fn collect_selection(view: &mut ListView, wanted: &HashSet<RecordId>) -> Result<()> {
    let mut number = 1;
    loop {
        let rows: Vec<Record> = view
            .load_page(number)
            .await?
            .items
            .iter()
            .filter(|record| wanted.contains(&record.id))
            .cloned()
            .collect();
        for row in &rows {
            view.toggle_row(row);
        }

        let page = view.page();
        let seen = u64::from(number) * page.items.len().max(1) as u64;
        let exhausted = page.items.is_empty() || page.total.is_some_and(|total| seen >= total);
        if view.selection().len() == wanted.len() || exhausted || number >= MAX_SCAN_PAGES {
            return Ok(());
        }
        number += 1;
    }
}

async fn notify(args: NotifyArgs, config: &ConsoleConfig) -> Result<()> {
    let remote = resolver(config, &args.resource)?;
    let mut view: ListView = ListView::new(remote.clone(), dispatcher(config, remote));

    let wanted: HashSet<RecordId> = record_ids(args.ids).into_iter().collect();
    collect_selection(&mut view, &wanted).await?;
    let missing: Vec<String> = wanted
        .iter()
        .filter(|id| !view.selection().is_selected(id))
        .map(ToString::to_string)
        .collect();
    if !missing.is_empty() {
        tracing::warn!("Records not found: {}", missing.join(", "));
    }

    let mut criteria = RecipientCriteria::new().with_id_field(&config.dispatch.identifier_field);
    if !args.recipients.is_empty() {
        criteria = criteria.with_ids(record_ids(args.recipients));
    }
    if !args.groups.is_empty() {
        criteria = criteria.with_groups(args.groups);
    }
    if !args.roles.is_empty() {
        criteria = criteria.with_roles(args.roles);
    }
    if !args.areas.is_empty() {
        criteria = criteria.with_areas(args.areas);
    }

    let mut draft = view.dispatcher().draft(args.subject).with_criteria(criteria);
    if !args.channels.is_empty() {
        let channels = parse_channels(args.channels.iter().map(String::as_str))
            .map_err(anyhow::Error::msg)?;
        draft = draft.with_channels(channels);
    }

    let template = FieldTemplate::parse(&args.template);
    let request = finish(view.share_selected(&template, draft).await)?;
    println!("{}", request.message);
    Ok(())
}

async fn archive(args: ArchiveArgs, config: &ConsoleConfig) -> Result<()> {
    let remote = resolver(config, &args.resource)?;
    let confirm: Box<dyn Confirm> = if args.yes {
        Box::new(AutoConfirm(true))
    } else {
        Box::new(StdinConfirm)
    };

    let target = ShareTarget::Many(record_ids(args.ids));
    let archived = finish(dispatcher(config, remote).archive(target, confirm.as_ref()).await)?;
    for id in archived {
        println!("{id}");
    }
    Ok(())
}

async fn lookup(args: LookupArgs, config: &ConsoleConfig) -> Result<()> {
    let remote = resolver(config, &args.resource)?;
    let field = config
        .reference_field(remote)
        .label(LabelSource::field(args.label))
        .build();
    field.initialize(Seed::None);

    let outcome = match args.query {
        Some(text) => field.on_query_change(text).await,
        None => field.on_open().await,
    };
    match outcome {
        SearchOutcome::Failed(err) => return Err(err.into()),
        SearchOutcome::Skipped => tracing::info!("Open search skipped, pass --query"),
        _ => {}
    }

    let mut out = std::io::stdout().lock();
    for (id, label) in field.render() {
        writeln!(out, "{id}\t{label}")?;
    }
    Ok(())
}
