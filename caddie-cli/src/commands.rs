//! CLI subcommand handlers.

use crate::AuthAction;
use crate::Commands;
use crate::CompareArgs;
use crate::ConfigAction;
use crate::render;
use caddie_core::credentials::{CredentialStore, KeyringCredentialStore};
use caddie_core::{
    CaddieConfig, Catalog, CatalogItem, ComparisonPipeline, ComparisonRequest, ItemDescriptor,
    ItemKey, ProviderId, ProviderRegistry, display_category,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Settings shared by every subcommand.
pub struct Context {
    pub workspace: PathBuf,
    /// `--catalog` override.
    pub catalog: Option<PathBuf>,
    pub quiet: bool,
}

impl Context {
    fn load_config(&self) -> anyhow::Result<CaddieConfig> {
        caddie_core::load_config(Some(&self.workspace), None)
            .map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))
    }

    fn catalog_path(&self, config: &CaddieConfig) -> PathBuf {
        match &self.catalog {
            Some(path) => path.clone(),
            None => config.catalog.resolve(&self.workspace),
        }
    }

    fn load_catalog(&self, config: &CaddieConfig) -> anyhow::Result<Catalog> {
        let path = self.catalog_path(config);
        debug!(path = %path.display(), "Loading catalog");
        Catalog::from_path(&path)
            .map_err(|e| anyhow::anyhow!("Failed to load catalog {}: {}", path.display(), e))
    }
}

/// Handle a CLI subcommand.
pub async fn handle_command(command: Commands, ctx: &Context) -> anyhow::Result<()> {
    match command {
        Commands::Brands => handle_brands(ctx),
        Commands::Categories { sub } => handle_categories(ctx, sub),
        Commands::Models { brand, category } => handle_models(ctx, &brand, category.as_deref()),
        Commands::Catalog {
            category,
            sub_category,
        } => handle_catalog(ctx, category.as_deref(), sub_category.as_deref()),
        Commands::Compare(args) => handle_compare(ctx, args).await,
        Commands::Config { action } => handle_config(action, &ctx.workspace),
        Commands::Auth { action } => handle_auth(action, &ctx.workspace),
    }
}

fn handle_brands(ctx: &Context) -> anyhow::Result<()> {
    let config = ctx.load_config()?;
    let catalog = ctx.load_catalog(&config)?;
    for brand in catalog.list_brands() {
        println!("{}", brand.name);
    }
    Ok(())
}

fn handle_categories(ctx: &Context, with_sub: bool) -> anyhow::Result<()> {
    let config = ctx.load_config()?;
    let catalog = ctx.load_catalog(&config)?;
    for category in catalog.list_categories() {
        println!("{:<16} {}", category, display_category(&category));
        if with_sub {
            for sub in catalog.list_sub_categories(Some(&category)) {
                println!("    {}", sub);
            }
        }
    }
    Ok(())
}

fn handle_models(ctx: &Context, brand: &str, category: Option<&str>) -> anyhow::Result<()> {
    let config = ctx.load_config()?;
    let catalog = ctx.load_catalog(&config)?;
    let items = catalog.list_items(brand, category, None);
    if items.is_empty() {
        println!("No models found for brand '{}'.", brand);
        return Ok(());
    }

    let mut current: Option<&str> = None;
    for item in &items {
        if current != Some(item.category.as_str()) {
            println!("{}:", display_category(&item.category));
            current = Some(item.category.as_str());
        }
        println!("  {}", item.picker_label());
    }
    Ok(())
}

fn handle_catalog(
    ctx: &Context,
    category: Option<&str>,
    sub_category: Option<&str>,
) -> anyhow::Result<()> {
    let config = ctx.load_config()?;
    let catalog = ctx.load_catalog(&config)?;
    let items = catalog.list_all_items(category, sub_category, None);
    if items.is_empty() {
        println!("No models match.");
        return Ok(());
    }
    for item in &items {
        println!(
            "{:<12} {:<14} {}",
            item.brand,
            item.category,
            item.picker_label()
        );
    }
    Ok(())
}

/// Look up one club within `category`.
fn resolve_item<'a>(
    catalog: &'a Catalog,
    category: &str,
    brand: &str,
    model: &str,
    year: i32,
    sub: Option<&str>,
) -> anyhow::Result<&'a CatalogItem> {
    if let Some(item) = catalog.find_item(brand, model, year, Some(category), sub) {
        return Ok(item);
    }
    match catalog.find_item(brand, model, year, None, sub) {
        Some(other) => anyhow::bail!(
            "'{} {} ({})' is a {}, not a {}",
            other.brand,
            other.name,
            other.year,
            display_category(&other.category),
            display_category(category)
        ),
        None => anyhow::bail!("'{} {} ({})' is not in the catalog", brand, model, year),
    }
}

/// Resolve both clubs and build the request. The second club may not be the
/// first one again.
fn build_request(
    catalog: &Catalog,
    args: &CompareArgs,
    provider: ProviderId,
) -> anyhow::Result<ComparisonRequest> {
    let first = resolve_item(
        catalog,
        &args.category,
        &args.first_brand,
        &args.first_model,
        args.first_year,
        args.first_sub.as_deref(),
    )?;
    let second = resolve_item(
        catalog,
        &args.category,
        &args.second_brand,
        &args.second_model,
        args.second_year,
        args.second_sub.as_deref(),
    )?;

    if ItemKey::from(first) == ItemKey::from(second) {
        anyhow::bail!(
            "Both clubs are '{}'; pick a different second club",
            ItemDescriptor::from(first).label()
        );
    }

    Ok(ComparisonRequest {
        item1: ItemDescriptor::from(first),
        item2: ItemDescriptor::from(second),
        player_skill_level: args.handicap,
        category: first.category.clone(),
        extra_notes: args.notes.clone(),
        provider,
    })
}

/// Build the configured providers and pick the one the comparison asked for.
fn select_pipeline(
    config: &CaddieConfig,
    provider_id: ProviderId,
    cred_store: &dyn CredentialStore,
) -> anyhow::Result<Arc<ComparisonPipeline>> {
    ProviderRegistry::from_config(config, Some(cred_store))
        .pipeline(provider_id)
        .map_err(|e| render::generation_failure(provider_id, &e))
}

async fn handle_compare(ctx: &Context, args: CompareArgs) -> anyhow::Result<()> {
    let config = ctx.load_config()?;
    let catalog = ctx.load_catalog(&config)?;
    let provider_id = args.provider.unwrap_or(config.default_provider);
    let request = build_request(&catalog, &args, provider_id)?;

    let provider_config = config.providers.get(provider_id);
    for warning in provider_config.validate() {
        eprintln!("Warning: {} config: {}", provider_id, warning);
    }

    let cred_store = KeyringCredentialStore::new();
    let pipeline = select_pipeline(&config, provider_id, &cred_store)?;

    if !ctx.quiet && !args.json {
        eprintln!(
            "Comparing {} with {} using {} ({})...",
            request.item1.label(),
            request.item2.label(),
            provider_id,
            pipeline.provider().model_name()
        );
    }

    info!(
        provider = %provider_id,
        first = %request.item1.label(),
        second = %request.item2.label(),
        handicap = request.player_skill_level,
        "Starting comparison"
    );
    let result = pipeline
        .compare(&request)
        .await
        .map_err(|e| render::generation_failure(provider_id, &e))?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print!("{}", render::render_comparison(&request, &result, render::WIDTH));
    }
    Ok(())
}

fn handle_config(action: ConfigAction, workspace: &Path) -> anyhow::Result<()> {
    match action {
        ConfigAction::Init => {
            let config_path = caddie_core::config::workspace_config_path(workspace);
            if config_path.exists() {
                println!(
                    "Configuration file already exists at: {}",
                    config_path.display()
                );
                return Ok(());
            }
            if let Some(dir) = config_path.parent() {
                std::fs::create_dir_all(dir)?;
            }

            let toml_str = toml::to_string_pretty(&CaddieConfig::default())?;
            std::fs::write(&config_path, &toml_str)?;
            println!(
                "Created default configuration at: {}",
                config_path.display()
            );
            Ok(())
        }
        ConfigAction::Show => {
            let mut config = caddie_core::load_config(Some(workspace), None)
                .map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))?;
            render::redact_secrets(&mut config);
            let toml_str = toml::to_string_pretty(&config)?;
            println!("{}", toml_str);
            Ok(())
        }
    }
}

/// Name a provider's key is stored under.
fn credential_name(config: &CaddieConfig, id: ProviderId) -> String {
    config
        .providers
        .get(id)
        .credential_store_key
        .clone()
        .unwrap_or_else(|| id.to_string())
}

fn handle_auth(action: AuthAction, workspace: &Path) -> anyhow::Result<()> {
    let config = caddie_core::load_config(Some(workspace), None)
        .map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))?;
    let cred_store = KeyringCredentialStore::new();

    match action {
        AuthAction::Status => {
            println!("API key sources:");
            for id in ProviderId::ALL {
                let provider = config.providers.get(id);
                let mut sources = Vec::new();
                if provider.api_key.is_some() {
                    sources.push("config file".to_string());
                }
                if cred_store.has_key(&credential_name(&config, id)) {
                    sources.push("credential store".to_string());
                }
                if std::env::var(&provider.api_key_env).is_ok_and(|v| !v.trim().is_empty()) {
                    sources.push(format!("${}", provider.api_key_env));
                }
                if sources.is_empty() {
                    println!("  {}: not configured", id);
                } else {
                    println!("  {}: {}", id, sources.join(", "));
                }
            }
            Ok(())
        }
        AuthAction::Set { provider } => {
            let api_key: String = dialoguer::Password::new()
                .with_prompt(format!("Enter your {} API key", provider))
                .interact()?;
            if api_key.trim().is_empty() {
                anyhow::bail!("API key must not be empty");
            }
            cred_store
                .store_key(&credential_name(&config, provider), api_key.trim())
                .map_err(|e| anyhow::anyhow!("Failed to store API key: {}", e))?;
            println!("API key for {} stored in the OS credential store.", provider);
            Ok(())
        }
        AuthAction::Remove { provider } => {
            cred_store
                .delete_key(&credential_name(&config, provider))
                .map_err(|e| anyhow::anyhow!("Failed to remove API key: {}", e))?;
            println!("API key for {} removed.", provider);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use caddie_core::InMemoryCredentialStore;

    const CATALOG_JSON: &str = r#"[
        {"brand": "Ping", "category": "DRIVER", "subcategory": "max", "name": "G430", "year": 2023},
        {"brand": "Ping", "category": "DRIVER", "subcategory": "lst", "name": "G430", "year": 2023},
        {"brand": "Ping", "category": "HYBRID", "subcategory": "standard", "name": "G430", "year": 2023},
        {"brand": "Callaway", "category": "DRIVER", "subcategory": "standard", "name": "Paradym", "year": 2023},
        {"brand": "Callaway", "category": "HYBRID", "subcategory": "standard", "name": "Paradym Super", "year": 2023}
    ]"#;

    fn args(second_brand: &str, second_model: &str, second_sub: Option<&str>) -> CompareArgs {
        CompareArgs {
            handicap: 12,
            category: "driver".into(),
            first_brand: "ping".into(),
            first_model: "G430".into(),
            first_year: 2023,
            first_sub: Some("max".into()),
            second_brand: second_brand.into(),
            second_model: second_model.into(),
            second_year: 2023,
            second_sub: second_sub.map(str::to_string),
            notes: String::new(),
            provider: None,
            json: false,
        }
    }

    #[test]
    fn test_build_request_resolves_catalog_items() {
        let catalog = Catalog::from_json_str(CATALOG_JSON).unwrap();
        let request =
            build_request(&catalog, &args("callaway", "paradym", None), ProviderId::OpenAi)
                .unwrap();
        assert_eq!(request.item1.label(), "Ping G430 (2023) [max]");
        assert_eq!(request.item2.label(), "Callaway Paradym (2023) [standard]");
        assert_eq!(request.category, "DRIVER");
        assert_eq!(request.player_skill_level, 12);
        assert_eq!(request.provider, ProviderId::OpenAi);
    }

    #[test]
    fn test_build_request_rejects_same_club_twice() {
        let catalog = Catalog::from_json_str(CATALOG_JSON).unwrap();
        let err = build_request(&catalog, &args("PING", "g430", Some("MAX")), ProviderId::Gemini)
            .unwrap_err();
        assert!(err.to_string().contains("different second club"));
    }

    #[test]
    fn test_build_request_allows_other_variant_of_same_model() {
        let catalog = Catalog::from_json_str(CATALOG_JSON).unwrap();
        let request = build_request(&catalog, &args("Ping", "G430", Some("lst")), ProviderId::Gemini)
            .unwrap();
        assert_eq!(request.item2.label(), "Ping G430 (2023) [lst]");
    }

    #[test]
    fn test_build_request_unknown_club() {
        let catalog = Catalog::from_json_str(CATALOG_JSON).unwrap();
        let err = build_request(&catalog, &args("Cobra", "Aerojet", None), ProviderId::Gemini)
            .unwrap_err();
        assert!(err.to_string().contains("not in the catalog"));
    }

    #[test]
    fn test_build_request_wrong_category() {
        let catalog = Catalog::from_json_str(CATALOG_JSON).unwrap();
        let err = build_request(
            &catalog,
            &args("Ping", "G430", Some("standard")),
            ProviderId::Gemini,
        )
        .unwrap_err();
        assert!(err.to_string().contains("is a Hybrid, not a Driver"));
    }

    #[test]
    fn test_build_request_picks_model_within_category() {
        let catalog = Catalog::from_json_str(CATALOG_JSON).unwrap();
        // The G430 driver sorts ahead of the hybrid of the same name and year.
        let mut hybrids = args("Callaway", "Paradym Super", None);
        hybrids.category = "HYBRID".into();
        hybrids.first_sub = None;

        let request = build_request(&catalog, &hybrids, ProviderId::Gemini).unwrap();
        assert_eq!(request.category, "HYBRID");
        assert_eq!(request.item1.label(), "Ping G430 (2023) [standard]");
        assert_eq!(request.item2.label(), "Callaway Paradym Super (2023) [standard]");
    }

    #[test]
    fn test_catalog_override_wins() {
        let ctx = Context {
            workspace: PathBuf::from("/ws"),
            catalog: Some(PathBuf::from("/elsewhere/clubs.json")),
            quiet: false,
        };
        let config = CaddieConfig::default();
        assert_eq!(
            ctx.catalog_path(&config),
            PathBuf::from("/elsewhere/clubs.json")
        );

        let ctx = Context {
            catalog: None,
            ..ctx
        };
        assert_eq!(
            ctx.catalog_path(&config),
            PathBuf::from("/ws/data/golf_catalog.json")
        );
    }

    #[test]
    fn test_select_pipeline_uses_requested_provider() {
        let mut config = CaddieConfig::default();
        for id in ProviderId::ALL {
            config.providers.get_mut(id).api_key_env = "CADDIE_CLI_TEST_NO_SUCH_KEY".into();
        }
        let store = InMemoryCredentialStore::new();
        store.store_key("perplexity", "pplx-key").unwrap();

        let pipeline = select_pipeline(&config, ProviderId::Perplexity, &store).unwrap();
        assert_eq!(pipeline.provider().provider_id(), ProviderId::Perplexity);

        let err = select_pipeline(&config, ProviderId::OpenAi, &store).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("openai"), "{message}");
        assert!(message.contains("caddie auth set openai"), "{message}");
    }

    #[test]
    fn test_credential_name_uses_override() {
        let mut config = CaddieConfig::default();
        assert_eq!(credential_name(&config, ProviderId::Gemini), "gemini");
        config.providers.openai.credential_store_key = Some("work-openai".into());
        assert_eq!(credential_name(&config, ProviderId::OpenAi), "work-openai");
    }
}
