//! `templates` and `generate`: browse the catalogue and render code.

use clap::Parser;
use serde_json::{Map, Value, json};

use super::Error;
use crate::{engine::ScriptEngine, models::TemplateCategory};

/// Arguments of `templates`.
#[derive(Parser, Debug)]
pub struct TemplatesArgs {
    /// Only list templates of this category.
    #[arg(short, long)]
    category: Option<TemplateCategory>,
}

/// Arguments of `generate`.
#[derive(Parser, Debug)]
pub struct GenerateArgs {
    /// Template id.
    template_id: String,
    /// Parameters as a JSON object.
    #[arg(short, long, default_value = "{}")]
    params: String,
}

/// Prints a summary of each template as JSON.
pub fn list(args: TemplatesArgs, engine: &ScriptEngine) -> Result<(), Error> {
    let templates = match args.category {
        Some(category) => engine.templates().get_templates_by_category(category),
        None => engine.templates().get_all_templates(),
    };
    let summary: Vec<Value> = templates
        .iter()
        .map(|t| {
            json!({
                "id": t.id,
                "name": t.name,
                "category": t.category,
                "description": t.description,
                "isSystem": t.is_system,
            })
        })
        .collect();
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

/// Prints the code generated from a template.
pub fn generate(args: GenerateArgs, engine: &ScriptEngine) -> Result<(), Error> {
    let params: Map<String, Value> = serde_json::from_str(&args.params)?;
    let code = engine.templates().generate_code(&args.template_id, &params)?;
    println!("{code}");
    Ok(())
}
