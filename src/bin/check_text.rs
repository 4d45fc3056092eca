use gibberish_guard::models::{Metadata, OnFailAction, ValidationOutcome};
use gibberish_guard::services::config_store::{ConfigStore, GuardConfig};
use gibberish_guard::services::gibberish::FilterOptions;
use gibberish_guard::services::registry::{Validator, ValidatorRegistry, GIBBERISH_VALIDATOR_NAME};
use gibberish_guard::services::setup::run_setup;
use gibberish_guard::{apply_on_fail, init_logging};
use serde::Serialize;

fn preview(s: &str, max_chars: usize) -> String {
    let mut out: String = s.chars().take(max_chars).collect();
    if s.chars().count() > max_chars {
        out.push_str("...");
    }
    out.replace('\n', " ")
}

fn parse_arg_value(args: &[String], key: &str) -> Option<String> {
    args.iter()
        .position(|a| a == key)
        .and_then(|i| args.get(i + 1))
        .cloned()
}

fn has_flag(args: &[String], key: &str) -> bool {
    args.iter().any(|a| a == key)
}

#[tokio::main]
async fn main() -> Result<(), String> {
    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 {
        eprintln!(
            "Usage:\n  check_text <path.txt> [--threshold <f>] [--method sentence|full] [--on-fail exception|filter|noop] [--out <json_path>]\n  check_text --text \"<literal text>\" [...]\n  check_text --setup [--tokenizer-version <semver>]\n\nNotes:\n  - Default method is sentence-level; gibberish sentences are listed and a cleaned value is offered.\n  - `--setup` downloads tokenizer data and warms up the classifier, then exits.\n  - Set GIBBERISH_GUARD_INFERENCE_URL to target a self-hosted inference endpoint."
        );
        return Ok(());
    }

    init_logging();

    if has_flag(&args, "--setup") {
        let version = parse_arg_value(&args, "--tokenizer-version")
            .unwrap_or_else(|| "3.9.0".to_string());
        run_setup(&version).await.map_err(|e| format!("setup failed: {:#}", e))?;
        println!("Setup complete.");
        return Ok(());
    }

    let text = match parse_arg_value(&args, "--text") {
        Some(t) => t,
        None => {
            let path = args[1].clone();
            std::fs::read_to_string(&path).map_err(|e| format!("read file failed: {}", e))?
        }
    };

    // Persisted settings supply defaults; command-line flags override them.
    let config = ConfigStore::default_config_dir()
        .map(ConfigStore::new)
        .and_then(|store| store.load().ok())
        .unwrap_or_else(GuardConfig::default);

    let threshold: f64 = parse_arg_value(&args, "--threshold")
        .and_then(|s| s.parse().ok())
        .unwrap_or(config.validation.threshold);
    let method = parse_arg_value(&args, "--method")
        .unwrap_or_else(|| config.validation.validation_method.clone());
    let on_fail = OnFailAction::parse(
        &parse_arg_value(&args, "--on-fail").unwrap_or_else(|| config.validation.on_fail.clone()),
    );
    let out_path = parse_arg_value(&args, "--out");

    let registry = ValidatorRegistry::builtin();
    let validator = registry
        .build(
            GIBBERISH_VALIDATOR_NAME,
            FilterOptions {
                threshold,
                validation_method: method.clone(),
            },
        )
        .map_err(|e| e.to_string())?;

    println!("Validator: {}", validator.name());
    println!("Method: {}  Threshold: {}", method, threshold);
    println!("Input: {} chars  \"{}\"", text.chars().count(), preview(&text, 100));
    println!();

    let mut metadata = Metadata::new();
    metadata.insert("source".to_string(), serde_json::json!("check_text"));

    let outcome = validator
        .validate(&text, metadata)
        .await
        .map_err(|e| e.to_string())?;

    match &outcome {
        ValidationOutcome::Pass => println!("PASS"),
        ValidationOutcome::Fail {
            error_message,
            fix_value,
            ..
        } => {
            println!("FAIL");
            println!();
            println!("{}", error_message);
            if let Some(fixed) = fix_value {
                println!();
                println!("Fixed value:\n{}", fixed);
            }
        }
    }

    let final_value = apply_on_fail(&text, &outcome, on_fail).map_err(|e| e.to_string())?;

    if let Some(out_path) = out_path {
        #[derive(Serialize)]
        #[serde(rename_all = "camelCase")]
        struct Output {
            validator: &'static str,
            method: String,
            threshold: f64,
            input_chars: usize,
            outcome: ValidationOutcome,
            final_value: String,
        }

        let out = Output {
            validator: GIBBERISH_VALIDATOR_NAME,
            method,
            threshold,
            input_chars: text.chars().count(),
            outcome,
            final_value,
        };

        let json = serde_json::to_string_pretty(&out).map_err(|e| e.to_string())?;
        std::fs::write(&out_path, json).map_err(|e| format!("write out failed: {}", e))?;
        println!();
        println!("Wrote JSON: {}", out_path);
    }

    Ok(())
}
