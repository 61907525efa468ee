//! `vantage` command-line front end
//!
//! Inspect the catalog and default layouts for an actor, persist dashboards
//! to a JSON store, and run the widget runtime against synthetic data.

mod synthetic;

use anyhow::{bail, Context, Result};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use synthetic::SyntheticProvider;
use tracing_subscriber::EnvFilter;
use vantage_catalog::{WidgetCategory, WidgetKind};
use vantage_core::{
    DashboardServices, DashboardSession, JsonFileGateway, LoadStatus, MemoryGateway,
    PersistenceGateway, ProviderRegistry, VantageConfig,
};
use vantage_model::{Actor, Dashboard, SubscriptionTier};

fn actor_args() -> [Arg; 6] {
    [
        Arg::new("actor")
            .long("actor")
            .default_value("demo")
            .help("Actor id"),
        Arg::new("org")
            .long("org")
            .default_value("demo-org")
            .help("Organization id"),
        Arg::new("role")
            .long("role")
            .default_value("viewer")
            .help("Role used to pick the default template"),
        Arg::new("perm")
            .long("perm")
            .action(ArgAction::Append)
            .help("Granted permission (repeatable)"),
        Arg::new("admin")
            .long("admin")
            .action(ArgAction::SetTrue)
            .help("Grant the admin override"),
        Arg::new("tier")
            .long("tier")
            .default_value("free")
            .help("Subscription tier: free, starter, professional, enterprise"),
    ]
}

fn json_arg() -> Arg {
    Arg::new("json")
        .long("json")
        .action(ArgAction::SetTrue)
        .help("Output as JSON")
}

fn store_arg() -> Arg {
    Arg::new("store")
        .long("store")
        .value_parser(value_parser!(PathBuf))
        .help("JSON dashboard store")
}

fn cli() -> Command {
    Command::new("vantage")
        .version(vantage_core::VERSION)
        .about("Analytics dashboard composition and widget runtime")
        .subcommand_required(true)
        .arg(
            Arg::new("config")
                .long("config")
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("TOML configuration file"),
        )
        .arg(
            Arg::new("log-json")
                .long("log-json")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Emit logs as JSON lines"),
        )
        .subcommand(
            Command::new("catalog")
                .about("List widget kinds the actor may place")
                .args(actor_args())
                .arg(json_arg()),
        )
        .subcommand(
            Command::new("layout")
                .about("Show the default dashboard generated for the actor")
                .args(actor_args())
                .arg(json_arg()),
        )
        .subcommand(
            Command::new("dashboards")
                .about("List the actor's saved dashboards")
                .args(actor_args())
                .arg(store_arg().required(true))
                .arg(json_arg()),
        )
        .subcommand(
            Command::new("save-default")
                .about("Persist the generated default dashboard")
                .args(actor_args())
                .arg(store_arg().required(true))
                .arg(Arg::new("name").long("name").help("Name for the saved dashboard")),
        )
        .subcommand(
            Command::new("refresh")
                .about("Load every widget of the actor's dashboard once")
                .args(actor_args())
                .arg(store_arg())
                .arg(
                    Arg::new("fail")
                        .long("fail")
                        .action(ArgAction::Append)
                        .help("Widget kind whose loads fail (repeatable)"),
                )
                .arg(
                    Arg::new("latency-ms")
                        .long("latency-ms")
                        .default_value("0")
                        .value_parser(value_parser!(u64))
                        .help("Simulated provider latency"),
                )
                .arg(json_arg()),
        )
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn required<'a>(args: &'a ArgMatches, id: &str) -> Result<&'a String> {
    args.get_one::<String>(id)
        .with_context(|| format!("missing --{id}"))
}

fn actor_from(args: &ArgMatches) -> Result<Actor> {
    let tier: SubscriptionTier = required(args, "tier")?.parse()?;
    let mut actor = Actor::new(
        required(args, "actor")?.as_str(),
        required(args, "role")?.as_str(),
        required(args, "org")?.as_str(),
    )
    .with_tier(tier);
    if let Some(perms) = args.get_many::<String>("perm") {
        actor = actor.with_permissions(perms.cloned());
    }
    if args.get_flag("admin") {
        actor = actor.admin();
    }
    Ok(actor)
}

fn services(
    config: &VantageConfig,
    store: Option<&PathBuf>,
    provider: SyntheticProvider,
) -> DashboardServices {
    let gateway: Arc<dyn PersistenceGateway> = match store {
        Some(path) => Arc::new(JsonFileGateway::new(path)),
        None => Arc::new(MemoryGateway::new()),
    };
    DashboardServices::from_config(
        config.clone(),
        gateway,
        ProviderRegistry::with_fallback(Arc::new(provider)),
    )
}

fn print_json(value: &impl serde::Serialize) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_dashboard(dashboard: &Dashboard) {
    println!("{} ({})", dashboard.name, dashboard.dashboard_id);
    if !dashboard.description.is_empty() {
        println!("  {}", dashboard.description);
    }
    for widget in dashboard.widgets() {
        println!(
            "  {:<24} {:<20} {}",
            widget.instance_id.as_str(),
            widget.kind_id.as_str(),
            widget.geometry
        );
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let matches = cli().get_matches();
    init_tracing(matches.get_flag("log-json"));

    let config = match matches.get_one::<PathBuf>("config") {
        Some(path) => VantageConfig::load(path)?,
        None => VantageConfig::default(),
    };

    let Some((command, args)) = matches.subcommand() else {
        bail!("no command given");
    };
    let actor = actor_from(args)?;
    tracing::debug!(command, actor = %actor.actor_id, tier = %actor.tier, "starting");
    let catalog = Arc::new(vantage_catalog::WidgetCatalog::builtin());

    match command {
        "catalog" => {
            let svc = services(&config, None, SyntheticProvider::new(catalog));
            let kinds = svc.visible_kinds(&actor);
            if args.get_flag("json") {
                return print_json(&kinds);
            }
            let mut grouped: BTreeMap<WidgetCategory, Vec<&WidgetKind>> = BTreeMap::new();
            for kind in kinds {
                grouped.entry(kind.category).or_default().push(kind);
            }
            for (category, kinds) in grouped {
                println!("{}", category.label());
                for kind in kinds {
                    println!(
                        "  {:<20} {:>2}x{:<2} {}",
                        kind.kind_id.as_str(),
                        kind.default_geometry.w,
                        kind.default_geometry.h,
                        kind.display_name
                    );
                }
            }
        }
        "layout" => {
            let svc = services(&config, None, SyntheticProvider::new(catalog));
            let dashboard = svc.generate_default(&actor);
            if args.get_flag("json") {
                return print_json(&dashboard);
            }
            print_dashboard(&dashboard);
        }
        "dashboards" => {
            let svc = services(&config, args.get_one("store"), SyntheticProvider::new(catalog));
            let dashboards = svc.gateway().list_dashboards(&actor).await?;
            if args.get_flag("json") {
                return print_json(&dashboards);
            }
            if dashboards.is_empty() {
                println!("no saved dashboards for {}", actor.actor_id);
            }
            for dashboard in &dashboards {
                print_dashboard(dashboard);
            }
        }
        "save-default" => {
            let svc = services(&config, args.get_one("store"), SyntheticProvider::new(catalog));
            let mut session = DashboardSession::open(svc, actor).await?;
            if !session.dashboard().is_default {
                bail!(
                    "{} already has a saved dashboard ({})",
                    session.actor().actor_id,
                    session.dashboard().dashboard_id
                );
            }
            session.start_editing()?;
            if let Some(name) = args.get_one::<String>("name") {
                session.rename(name.clone(), None)?;
            }
            let saved = session.save().await?;
            println!("saved {} as {}", saved.name, saved.dashboard_id);
        }
        "refresh" => {
            let failing = args
                .get_many::<String>("fail")
                .map(|kinds| kinds.cloned().collect::<Vec<_>>())
                .unwrap_or_default();
            let latency = args.get_one::<u64>("latency-ms").copied().unwrap_or(0);
            let provider = SyntheticProvider::new(catalog)
                .with_failing(failing)
                .with_latency(Duration::from_millis(latency));

            let svc = services(&config, args.get_one("store"), provider);
            let session = DashboardSession::open(svc, actor).await?;
            let report = session.refresh_all().await;
            let states = session.runtime().states();

            if args.get_flag("json") {
                return print_json(&states);
            }
            print_dashboard(session.dashboard());
            println!();
            for (instance_id, state) in &states {
                match state.status {
                    LoadStatus::Success => println!(
                        "  ok    {:<24} {}",
                        instance_id.as_str(),
                        state.data.as_ref().map(ToString::to_string).unwrap_or_default()
                    ),
                    LoadStatus::Error => println!(
                        "  error {:<24} {}",
                        instance_id.as_str(),
                        state.error.as_deref().unwrap_or_default()
                    ),
                    status => println!("  {status:?} {}", instance_id.as_str()),
                }
            }
            println!(
                "\n{} succeeded, {} failed",
                report.succeeded.len(),
                report.failed.len()
            );
        }
        other => bail!("unknown command: {other}"),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        cli().debug_assert();
    }

    #[test]
    fn parses_actor_claims() {
        let matches = cli()
            .try_get_matches_from([
                "vantage", "catalog", "--role", "analyst", "--perm", "analytics.read", "--perm",
                "customer.read", "--tier", "pro",
            ])
            .unwrap();
        let (_, args) = matches.subcommand().unwrap();
        let actor = actor_from(args).unwrap();
        assert_eq!(actor.role.as_str(), "analyst");
        assert_eq!(actor.permissions.len(), 2);
        assert_eq!(actor.tier, SubscriptionTier::Professional);
        assert!(!actor.is_admin);
    }

    #[test]
    fn rejects_unknown_tier() {
        let matches = cli()
            .try_get_matches_from(["vantage", "layout", "--tier", "platinum"])
            .unwrap();
        let (_, args) = matches.subcommand().unwrap();
        assert!(actor_from(args).is_err());
    }

    #[test]
    fn store_is_required_for_dashboards() {
        assert!(cli()
            .try_get_matches_from(["vantage", "dashboards"])
            .is_err());
    }

    #[tokio::test]
    async fn save_default_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = dir.path().join("dashboards.json");
        let actor = Actor::new("u1", "viewer", "acme");
        let catalog = Arc::new(vantage_catalog::WidgetCatalog::builtin());

        let svc = services(
            &VantageConfig::default(),
            Some(&store),
            SyntheticProvider::new(catalog.clone()),
        );
        let mut session = DashboardSession::open(svc, actor.clone()).await.unwrap();
        session.start_editing().unwrap();
        session.save().await.unwrap();

        let svc = services(&VantageConfig::default(), Some(&store), SyntheticProvider::new(catalog));
        let listed = svc.gateway().list_dashboards(&actor).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert!(!listed[0].is_default);
    }
}
