use std::time::Duration;

use xloader::{
    dependency_order, ActivationGate, LoadDefinition, LoadResult, LoaderConfig, PluginFactory,
    PluginLoader,
};

struct Minifier {
    level: u64,
}

fn demo_definitions() -> Vec<LoadDefinition> {
    vec![
        LoadDefinition::from_fn("bundler", || async {
            tokio::time::sleep(Duration::from_millis(30)).await;
            LoadResult::Ok(PluginFactory::value("bundler"))
        })
        .required(true)
        .depends_on(["resolver"]),
        LoadDefinition::from_fn("resolver", || async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            LoadResult::Ok(PluginFactory::value("resolver"))
        })
        .required(true),
        LoadDefinition::from_fn("minifier", || async {
            LoadResult::Ok(PluginFactory::invocable(|options| {
                let level = options
                    .and_then(|o| o.get("level"))
                    .and_then(serde_json::Value::as_u64)
                    .unwrap_or(1);
                Ok(Minifier { level })
            }))
        })
        .options(serde_json::json!({"level": 3}))
        .depends_on(["bundler"]),
        LoadDefinition::from_fn("ci-reporter", || async {
            LoadResult::Ok(PluginFactory::value("ci-reporter"))
        })
        .when(ActivationGate::env_present("CI")),
    ]
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    println!("=== XLoader demo ===\n");

    let config = LoaderConfig {
        max_parallel: 2,
        timeout_ms: 1_000,
        ..LoaderConfig::default()
    };
    let loader = match PluginLoader::new(config) {
        Ok(loader) => loader,
        Err(e) => {
            eprintln!("Invalid loader config: {}", e);
            std::process::exit(2);
        }
    };

    let definitions = match dependency_order(&demo_definitions()) {
        Ok(definitions) => definitions,
        Err(e) => {
            eprintln!("Invalid plugin definitions: {}", e);
            std::process::exit(2);
        }
    };

    match loader.load_all(&definitions).await {
        Ok(instances) => println!("Loaded {} plugin(s)", instances.len()),
        Err(e) => {
            eprintln!("Batch failed: {}", e);
            std::process::exit(1);
        }
    }

    if let Some(minifier) = loader.get("minifier").and_then(|p| p.downcast::<Minifier>()) {
        println!("Minifier configured at level {}", minifier.level);
    }

    match serde_json::to_string_pretty(&loader.stats()) {
        Ok(json) => println!("\nStats:\n{}", json),
        Err(e) => eprintln!("Failed to render stats: {}", e),
    }
}
