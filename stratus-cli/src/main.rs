mod apply;
mod config;
mod state;

use std::collections::{HashMap, HashSet};
use std::io;
use std::path::{Path, PathBuf};

use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use colored::Colorize;
use log::LevelFilter;
use serde::Serialize;

use stratus_core::arn::Arn;
use stratus_core::differ::{create_plan, destroy_plan};
use stratus_core::effect::Effect;
use stratus_core::plan::Plan;
use stratus_core::provider::Provider;
use stratus_core::resource::{Resource, ResourceId, State, Value};
use stratus_core::schema::ResourceSchema;
use stratus_provider_aws::AwsProvider;
use stratus_provider_aws::config::ProviderConfig;
use stratus_provider_aws::error::ApiResult;
use stratus_provider_aws::globalaccelerator::{
    self, endpoint_group_arn_to_listener_arn, listener_or_endpoint_group_arn_to_accelerator_arn,
};
use stratus_provider_aws::memorydb::list_pages::{
    describe_acls_pages, describe_clusters_pages, describe_parameter_groups_pages,
    describe_snapshots_pages, describe_subnet_groups_pages, describe_users_pages,
};
use stratus_provider_aws::memorydb::{DescribeInput, MemoryDbApi};
use stratus_provider_aws::resources;

use crate::apply::{apply_plan, forget_missing, refresh};
use crate::config::{ConfigFile, validate_resources};
use crate::state::{ResourceState, StateFile};

#[derive(Parser)]
#[command(name = "stratus")]
#[command(about = "Manage AWS WAF and MemoryDB objects from a JSON configuration", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    global: GlobalArgs,
}

#[derive(clap::Args)]
struct GlobalArgs {
    /// AWS region (overrides the provider block)
    #[arg(long, global = true, env = "AWS_REGION")]
    region: Option<String>,

    /// Named profile from the shared AWS config files
    #[arg(long, global = true)]
    profile: Option<String>,

    /// Log level: off, error, warn, info, debug, trace (default: RUST_LOG or warn)
    #[arg(long, global = true)]
    log_level: Option<LevelFilter>,

    /// Path to the state file
    #[arg(long, global = true, default_value = state::DEFAULT_STATE_FILE)]
    state: PathBuf,

    /// Configuration file whose provider block read, import and list use
    #[arg(long = "config", global = true, value_name = "FILE")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate the configuration file
    Validate {
        /// Path to the JSON configuration
        #[arg(default_value = "stratus.json")]
        file: PathBuf,
    },
    /// Show execution plan without applying changes
    Plan {
        /// Path to the JSON configuration
        #[arg(default_value = "stratus.json")]
        file: PathBuf,
    },
    /// Apply changes to reach the desired state
    Apply {
        /// Path to the JSON configuration
        #[arg(default_value = "stratus.json")]
        file: PathBuf,
    },
    /// Destroy all resources defined in the configuration file
    Destroy {
        /// Path to the JSON configuration
        #[arg(default_value = "stratus.json")]
        file: PathBuf,

        /// Skip confirmation prompt (auto-approve)
        #[arg(long)]
        auto_approve: bool,
    },
    /// Show the remote state of one object
    Read {
        /// Resource type (e.g. waf.size_constraint_set)
        resource_type: String,
        /// Name to report the object under
        name: String,
        /// Remote identifier (for data sources: the object name)
        #[arg(long)]
        id: String,
    },
    /// Adopt an existing remote object into the state file
    Import {
        /// Resource type (e.g. waf.size_constraint_set)
        resource_type: String,
        /// Resource name in the configuration
        name: String,
        /// Remote identifier
        #[arg(long)]
        id: String,
    },
    /// List MemoryDB objects
    List {
        kind: ListKind,

        /// Only the object with this name
        #[arg(long)]
        name: Option<String>,

        /// Items requested per page
        #[arg(long)]
        page_size: Option<i32>,
    },
    /// Show the components of an ARN
    Arn { arn: String },
    /// Show attribute schemas
    Schema {
        /// Only this resource type
        resource_type: Option<String>,
    },
    /// Generate shell completions
    Completions { shell: Shell },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ListKind {
    Acls,
    Clusters,
    ParameterGroups,
    Snapshots,
    SubnetGroups,
    Users,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.global.log_level);

    let global = &cli.global;
    let result = match cli.command {
        Commands::Validate { file } => run_validate(&file, global),
        Commands::Plan { file } => run_plan(&file, global).await,
        Commands::Apply { file } => run_apply(&file, global).await,
        Commands::Destroy { file, auto_approve } => run_destroy(&file, auto_approve, global).await,
        Commands::Read {
            resource_type,
            name,
            id,
        } => run_read(ResourceId::new(resource_type, name), &id, global).await,
        Commands::Import {
            resource_type,
            name,
            id,
        } => run_import(ResourceId::new(resource_type, name), &id, global).await,
        Commands::List {
            kind,
            name,
            page_size,
        } => run_list(kind, name, page_size, global).await,
        Commands::Arn { arn } => run_arn(&arn),
        Commands::Schema { resource_type } => run_schema(resource_type.as_deref()),
        Commands::Completions { shell } => {
            clap_complete::generate(shell, &mut Cli::command(), "stratus", &mut io::stdout());
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("{} {}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

fn init_logging(level: Option<LevelFilter>) {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"));
    if let Some(level) = level {
        builder.filter_level(level);
    }
    builder.format_timestamp(None).init();
}

fn get_schemas() -> HashMap<String, ResourceSchema> {
    resources::all_schemas()
}

fn data_source_types() -> HashSet<String> {
    resources::resource_types()
        .into_iter()
        .filter(|t| t.is_data_source())
        .map(|t| t.name().to_string())
        .collect()
}

/// Parse and validate a configuration file
fn load_config(file: &Path) -> Result<(ConfigFile, Vec<Resource>), String> {
    let config = ConfigFile::load(file)?;
    let schemas = get_schemas();
    let resources = config.resources(&schemas)?;
    validate_resources(&resources, &schemas, &data_source_types())?;
    Ok((config, resources))
}

/// CLI flags override the configuration's provider block
fn provider_config(
    mut attributes: HashMap<String, Value>,
    global: &GlobalArgs,
) -> Result<ProviderConfig, String> {
    if let Some(region) = &global.region {
        attributes.insert("region".to_string(), Value::String(region.clone()));
    }
    if let Some(profile) = &global.profile {
        attributes.insert("profile".to_string(), Value::String(profile.clone()));
    }

    ProviderConfig::from_attributes(&attributes)
        .map_err(|e| format!("Invalid provider configuration: {}", e))
}

async fn get_provider(
    attributes: HashMap<String, Value>,
    global: &GlobalArgs,
) -> Result<AwsProvider, String> {
    let config = provider_config(attributes, global)?;
    AwsProvider::new(config).await.map_err(|e| e.to_string())
}

/// Provider block of `--config`; empty without one
fn standalone_provider_attributes(global: &GlobalArgs) -> Result<HashMap<String, Value>, String> {
    match &global.config {
        Some(path) => Ok(ConfigFile::load(path)?.provider_attributes()),
        None => Ok(HashMap::new()),
    }
}

fn run_validate(file: &Path, global: &GlobalArgs) -> Result<(), String> {
    let (config, resources) = load_config(file)?;
    provider_config(config.provider_attributes(), global)?;

    println!("{}", "Validating...".cyan());
    println!(
        "{}",
        format!("✓ {} resources validated successfully.", resources.len())
            .green()
            .bold()
    );
    for resource in &resources {
        println!("  • {}", resource.id);
    }
    Ok(())
}

async fn run_plan(file: &Path, global: &GlobalArgs) -> Result<(), String> {
    let (config, resources) = load_config(file)?;
    let provider = get_provider(config.provider_attributes(), global).await?;
    let state = StateFile::load(&global.state)?;

    let current_states = refresh(&provider, &state).await?;
    let plan = create_plan(&resources, &current_states, &get_schemas());
    print_plan(&plan);
    Ok(())
}

async fn run_apply(file: &Path, global: &GlobalArgs) -> Result<(), String> {
    let (config, resources) = load_config(file)?;
    let provider = get_provider(config.provider_attributes(), global).await?;
    let mut state = StateFile::load(&global.state)?;

    let current_states = refresh(&provider, &state).await?;
    forget_missing(&mut state, &current_states);
    let plan = create_plan(&resources, &current_states, &get_schemas());

    if plan.mutation_count() == 0 {
        println!("{}", "No changes needed.".green());
        return state.save(&global.state);
    }

    print_plan(&plan);
    println!();
    println!("{}", "Applying changes...".cyan().bold());
    println!();

    let result = apply_plan(&provider, &plan, &mut state).await;
    state.save(&global.state)?;

    println!();
    if result.failure == 0 {
        println!(
            "{}",
            format!("Apply complete! {} changes applied.", result.success)
                .green()
                .bold()
        );
        Ok(())
    } else {
        Err(format!(
            "Apply failed. {} succeeded, {} failed.",
            result.success, result.failure
        ))
    }
}

async fn run_destroy(file: &Path, auto_approve: bool, global: &GlobalArgs) -> Result<(), String> {
    let (config, resources) = load_config(file)?;
    let provider = get_provider(config.provider_attributes(), global).await?;
    let mut state = StateFile::load(&global.state)?;

    let current_states = refresh(&provider, &state).await?;
    forget_missing(&mut state, &current_states);
    let plan = destroy_plan(&resources, &current_states);

    if plan.is_empty() {
        println!("{}", "No resources to destroy.".green());
        return state.save(&global.state);
    }

    println!("{}", "Destroy Plan:".red().bold());
    println!();
    for effect in plan.effects() {
        println!("  {} {}", "-".red().bold(), effect.resource_id());
    }
    println!();
    println!("Plan: {} to destroy.", plan.effects().len().to_string().red());
    println!();

    if !auto_approve && !confirm_destroy()? {
        println!();
        println!("{}", "Destroy cancelled.".yellow());
        return Ok(());
    }

    println!("{}", "Destroying resources...".red().bold());
    println!();

    let result = apply_plan(&provider, &plan, &mut state).await;
    state.save(&global.state)?;

    println!();
    if result.failure == 0 {
        println!(
            "{}",
            format!("Destroy complete! {} resources destroyed.", result.success)
                .green()
                .bold()
        );
        Ok(())
    } else {
        Err(format!(
            "Destroy failed. {} succeeded, {} failed.",
            result.success, result.failure
        ))
    }
}

fn confirm_destroy() -> Result<bool, String> {
    println!(
        "{}",
        "Do you really want to destroy all resources?"
            .yellow()
            .bold()
    );
    println!(
        "  {}",
        "This action cannot be undone. Type 'yes' to confirm.".yellow()
    );
    print!("\n  Enter a value: ");
    io::Write::flush(&mut io::stdout()).map_err(|e| e.to_string())?;

    let mut input = String::new();
    io::stdin()
        .read_line(&mut input)
        .map_err(|e| e.to_string())?;
    println!();
    Ok(input.trim() == "yes")
}

/// Read one object; data sources are looked up by name
async fn read_one(provider: &dyn Provider, id: &ResourceId, identifier: &str) -> Result<State, String> {
    let result = if data_source_types().contains(&id.resource_type) {
        let resource = Resource::new(&id.resource_type, &id.name)
            .with_attribute("name", Value::String(identifier.to_string()))
            .with_read_only(true);
        provider.read_data_source(&resource).await
    } else {
        provider.read(id, Some(identifier)).await
    };
    let state = result.map_err(|e| e.to_string())?;

    if state.exists {
        Ok(state)
    } else {
        Err(format!("{} ({}) not found", id, identifier))
    }
}

async fn run_read(id: ResourceId, identifier: &str, global: &GlobalArgs) -> Result<(), String> {
    let provider = get_provider(standalone_provider_attributes(global)?, global).await?;
    let state = read_one(&provider, &id, identifier).await?;

    println!(
        "{} {} ({})",
        "●".cyan(),
        id.to_string().bold(),
        state.identifier.as_deref().unwrap_or(identifier)
    );
    print_attributes(&state.attributes, "    ");
    Ok(())
}

async fn run_import(id: ResourceId, identifier: &str, global: &GlobalArgs) -> Result<(), String> {
    if data_source_types().contains(&id.resource_type) {
        return Err(format!(
            "{} is a data source and cannot be imported",
            id.resource_type
        ));
    }

    let provider = get_provider(standalone_provider_attributes(global)?, global).await?;
    let mut state = StateFile::load(&global.state)?;
    if let Some(existing) = state.identifier(&id) {
        return Err(format!(
            "{} is already managed ({}); remove it from {} first",
            id,
            existing,
            global.state.display()
        ));
    }

    let imported = provider
        .import(&id, identifier)
        .await
        .map_err(|e| e.to_string())?;
    let entry = ResourceState::from_state(&imported)
        .ok_or_else(|| format!("{}: provider returned no identifier", id))?;
    state.upsert(entry);
    state.save(&global.state)?;

    println!(
        "{}",
        format!("Imported {} ({}).", id, identifier).green().bold()
    );
    Ok(())
}

fn to_json<T: Serialize>(item: &T) -> serde_json::Value {
    serde_json::to_value(item).unwrap_or(serde_json::Value::Null)
}

/// Collect every page of a MemoryDB describe operation as JSON
async fn list_items(
    api: &dyn MemoryDbApi,
    kind: ListKind,
    input: DescribeInput,
) -> ApiResult<Vec<serde_json::Value>> {
    let mut items = Vec::new();
    macro_rules! collect {
        ($pages_fn:ident) => {
            $pages_fn(api, input, |page, _| {
                items.extend(page.items.iter().map(to_json));
                true
            })
            .await
        };
    }

    match kind {
        ListKind::Acls => collect!(describe_acls_pages),
        ListKind::Clusters => collect!(describe_clusters_pages),
        ListKind::ParameterGroups => collect!(describe_parameter_groups_pages),
        ListKind::Snapshots => collect!(describe_snapshots_pages),
        ListKind::SubnetGroups => collect!(describe_subnet_groups_pages),
        ListKind::Users => collect!(describe_users_pages),
    }?;

    Ok(items)
}

async fn run_list(
    kind: ListKind,
    name: Option<String>,
    page_size: Option<i32>,
    global: &GlobalArgs,
) -> Result<(), String> {
    let provider = get_provider(standalone_provider_attributes(global)?, global).await?;
    let input = DescribeInput {
        name,
        max_results: page_size,
        next_token: None,
    };

    let items = list_items(provider.memorydb(), kind, input)
        .await
        .map_err(|e| e.to_string())?;
    let output = serde_json::to_string_pretty(&items).map_err(|e| e.to_string())?;
    println!("{}", output);
    Ok(())
}

fn run_arn(input: &str) -> Result<(), String> {
    let arn: Arn = input.parse().map_err(|e| format!("{}", e))?;

    println!("{:<12} {}", "partition:".bold(), arn.partition);
    println!("{:<12} {}", "service:".bold(), arn.service);
    println!("{:<12} {}", "region:".bold(), arn.region);
    println!("{:<12} {}", "account:".bold(), arn.account_id);
    println!("{:<12} {}", "resource:".bold(), arn.resource);

    if arn.service == globalaccelerator::SERVICE {
        if let Ok(accelerator) = listener_or_endpoint_group_arn_to_accelerator_arn(input) {
            println!("{:<12} {}", "accelerator:".bold(), accelerator);
        }
        if let Ok(listener) = endpoint_group_arn_to_listener_arn(input) {
            println!("{:<12} {}", "listener:".bold(), listener);
        }
    }
    Ok(())
}

fn run_schema(resource_type: Option<&str>) -> Result<(), String> {
    let types = resources::resource_types();
    let selected: Vec<_> = match resource_type {
        Some(name) => {
            let found: Vec<_> = types.into_iter().filter(|t| t.name() == name).collect();
            if found.is_empty() {
                return Err(format!("Unknown resource type: {}", name));
            }
            found
        }
        None => types,
    };

    for (i, t) in selected.iter().enumerate() {
        if i > 0 {
            println!();
        }
        let kind = if t.is_data_source() {
            "data source"
        } else {
            "resource"
        };
        println!("{} ({})", t.name().cyan().bold(), kind);
        print!("{}", format_schema(&t.schema()));
    }
    Ok(())
}

fn format_schema(schema: &ResourceSchema) -> String {
    let mut out = String::new();
    for name in schema.attribute_names() {
        let Some(attr) = schema.attributes.get(name) else {
            continue;
        };
        let mut flags = Vec::new();
        if attr.required {
            flags.push("required");
        }
        if attr.computed {
            flags.push("computed");
        }
        if attr.force_new {
            flags.push("forces replacement");
        }

        out.push_str(&format!("  {}: {}", name, attr.attr_type));
        if !flags.is_empty() {
            out.push_str(&format!(" ({})", flags.join(", ")));
        }
        out.push('\n');
    }
    out
}

fn print_plan(plan: &Plan) {
    if plan.mutation_count() == 0 {
        println!("{}", "No changes. Infrastructure is up-to-date.".green());
        return;
    }

    println!("{}", "Execution Plan:".cyan().bold());
    println!();

    for effect in plan.effects() {
        match effect {
            Effect::Read(resource) => {
                println!("  {} {} (data source)", "<=".cyan().bold(), resource.id);
            }
            Effect::Create(resource) => {
                println!("  {} {}", "+".green().bold(), resource.id);
                print_attributes(&resource.attributes, "      ");
            }
            Effect::Update {
                id,
                from,
                to,
                changed_attributes,
            } => {
                println!("  {} {}", "~".yellow().bold(), id);
                print_changes(from, to, changed_attributes);
            }
            Effect::Replace {
                id,
                from,
                to,
                changed_attributes,
            } => {
                println!("  {} {}", "-/+".magenta().bold(), id);
                print_changes(from, to, changed_attributes);
            }
            Effect::Delete { id, identifier } => {
                println!("  {} {} ({})", "-".red().bold(), id, identifier);
            }
        }
    }

    println!();
    let summary = plan.summary();
    println!(
        "Plan: {} to add, {} to change, {} to replace, {} to destroy.",
        summary.create.to_string().green(),
        summary.update.to_string().yellow(),
        summary.replace.to_string().magenta(),
        summary.delete.to_string().red()
    );
}

fn print_attributes(attributes: &HashMap<String, Value>, indent: &str) {
    let mut keys: Vec<&String> = attributes.keys().collect();
    keys.sort();
    for key in keys {
        println!("{}{}: {}", indent, key, format_value(&attributes[key]));
    }
}

fn print_changes(from: &State, to: &Resource, changed_attributes: &[String]) {
    for key in changed_attributes {
        let old = from
            .attributes
            .get(key)
            .map(format_value)
            .unwrap_or_else(|| "(none)".to_string());
        let new = to
            .attributes
            .get(key)
            .map(format_value)
            .unwrap_or_else(|| "(none)".to_string());
        println!("      {}: {} → {}", key, old.red(), new.green());
    }
}

fn format_value(value: &Value) -> String {
    match value {
        Value::String(s) => format!("\"{}\"", s),
        Value::Int(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::List(items) => {
            let strs: Vec<_> = items.iter().map(format_value).collect();
            format!("[{}]", strs.join(", "))
        }
        Value::Set(items) => {
            let mut strs: Vec<_> = items.iter().map(format_value).collect();
            strs.sort();
            format!("{{{}}}", strs.join(", "))
        }
        Value::Map(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            let strs: Vec<_> = keys
                .into_iter()
                .map(|k| format!("{}: {}", k, format_value(&map[k])))
                .collect();
            format!("{{{}}}", strs.join(", "))
        }
    }
}
