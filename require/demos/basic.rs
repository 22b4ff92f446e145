//! Basic example of require: exports, extenders, injection and mocking.

use std::sync::Arc;

use require::prelude::*;
use require::rendering::short_export_name;
use tracing::info;

// === Define your traits and types ===

trait Logger: Send + Sync {
    fn log(&self, msg: &str);
}

struct ConsoleLogger {
    prefix: String,
}

impl Logger for ConsoleLogger {
    fn log(&self, msg: &str) {
        println!("[{}] {msg}", self.prefix);
    }
}

struct Config {
    database_url: String,
}

struct Database {
    url: String,
    logger: Arc<dyn Logger>,
}

impl Database {
    fn query(&self, sql: &str) -> String {
        self.logger.log(&format!("Executing: {sql}"));
        format!("Results from {}", self.url)
    }
}

// === Group registrations by concern ===

struct InfrastructureProvider;

impl Provider for InfrastructureProvider {
    fn register(&self, module: &Module) -> Result<()> {
        module.export(ExportOptions::named("app:config"), |_| {
            Ok(Config {
                database_url: "postgres://localhost/myapp".to_string(),
            })
        })?;

        module.export(ExportOptions::named("app:logger"), |_| {
            Ok(Arc::new(ConsoleLogger {
                prefix: "LOG".to_string(),
            }) as Arc<dyn Logger>)
        })?;

        // Database: singleton, requires config and logger
        module.export(
            ExportOptions::named("app:database")
                .require("config", "app:config")
                .require("logger", "app:logger"),
            |kwargs| {
                Ok(Database {
                    url: kwargs.get::<Config>("config")?.database_url.clone(),
                    logger: (*kwargs.get::<Arc<dyn Logger>>("logger")?).clone(),
                })
            },
        )?;

        Ok(())
    }
}

fn main() -> Result<()> {
    // Initialize tracing (logging)
    tracing_subscriber::fmt()
        .with_env_filter("require_container=debug,basic=info")
        .init();

    let module = Module::builder().label("demo").build();
    module.add_provider(&InfrastructureProvider)?;
    info!(exports = module.len(), "Module ready");

    // Louder logger: extenders may replace the instance
    module.extend(
        "app:logger",
        Requirements::new(),
        |_: &mut Arc<dyn Logger>, _: &Kwargs| {
            Ok(Some(Arc::new(ConsoleLogger {
                prefix: "LOUD".to_string(),
            }) as Arc<dyn Logger>))
        },
    )?;

    // Inject the database into a plain function
    let find_user = module.wrap(
        |id: u64, kwargs: &Kwargs| {
            let db = kwargs.get::<Database>("db")?;
            Ok(db.query(&format!("SELECT * FROM users WHERE id = {id}")))
        },
        Requirements::new().require("db", "app:database"),
    )?;

    println!("{}", find_user.call(42)?);

    // Same database instance every time (singleton)
    let database = module.property("app:database")?;
    assert!(Arc::ptr_eq(
        &database.get::<Database>()?,
        &database.get::<Database>()?
    ));

    // Swap the logger for a quiet one while running a closure
    let quiet = require::mock::mock(&module, "app:logger")?.returning(|| {
        Arc::new(ConsoleLogger {
            prefix: "MOCK".to_string(),
        }) as Arc<dyn Logger>
    });
    quiet.run(|| -> Result<()> {
        let logger = module.property("app:logger")?.get::<Arc<dyn Logger>>()?;
        logger.log("Hello from the double");
        Ok(())
    })?;

    info!(substituted = module.load("app:logger")?.is_substituted(), "Mock finished");

    for info in module.describe() {
        println!(
            "{:<12} scope={:<9} extenders={} instantiated={}",
            short_export_name(&info.name),
            info.scope,
            info.extenders,
            info.instantiated
        );
    }

    println!("\nAll checks passed!");
    Ok(())
}
