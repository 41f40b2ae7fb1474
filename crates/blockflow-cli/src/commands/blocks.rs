//! Block library listing and definition details.

#![allow(clippy::print_literal)] // Table headers use literal strings

use blockflow_core::{BlockDefinition, PortDefinition};
use blockflow_registry::{CategoryTree, DefinitionRegistry};
use clap::Args;

#[derive(Args)]
pub struct BlocksArgs {
    /// Show details for a specific block
    #[arg(value_name = "ID")]
    id: Option<String>,

    /// Print the definition as a description file
    #[arg(long, requires = "id")]
    toml: bool,
}

pub fn run(args: BlocksArgs, registry: &DefinitionRegistry) -> anyhow::Result<()> {
    let Some(id) = &args.id else {
        println!("Available Blocks");
        println!("================");
        print_tree(&registry.categories(), registry, 0);
        println!();
        println!("Use 'blockflow blocks <id>' for parameters and ports.");
        return Ok(());
    };

    let definition = registry.get(id)?;
    if args.toml {
        print!("{}", DefinitionRegistry::to_toml(&definition)?);
    } else {
        print_definition(&definition);
    }
    Ok(())
}

fn print_tree(tree: &CategoryTree, registry: &DefinitionRegistry, depth: usize) {
    let indent = "  ".repeat(depth);
    for id in &tree.blocks {
        let label = registry.get(id).map(|d| d.label.clone()).unwrap_or_default();
        println!("{indent}  {id:18} {label}");
    }
    for child in tree.children.values() {
        println!();
        println!("{indent}{}", child.name);
        print_tree(child, registry, depth + 1);
    }
}

fn print_definition(def: &BlockDefinition) {
    let title = format!("{} ({})", def.label, def.id);
    println!("{title}");
    println!("{}", "=".repeat(title.len()));
    println!();
    println!("  kind:     {}", def.kind.as_str());
    if !def.category.is_empty() {
        println!("  category: {}", def.category_path());
    }
    if def.evaluatable {
        println!("  value:    ${{{}}}", def.value_param);
    }
    if !def.documentation.is_empty() {
        println!();
        println!("{}", def.documentation);
    }

    if !def.params.is_empty() {
        println!();
        println!("Parameters:");
        println!("  {:14}  {:12}  {}", "Id", "Type", "Default");
        println!("  {:14}  {:12}  {}", "--", "----", "-------");
        for param in &def.params {
            let mut default = param.default.clone();
            if !param.options.is_empty() {
                let keys: Vec<&str> = param.options.iter().map(|o| o.key.as_str()).collect();
                default = format!("{default} [{}]", keys.join("|"));
            }
            println!("  {:14}  {:12}  {default}", param.id, param.dtype.as_str());
        }
    }

    for (heading, ports) in [("Inputs", &def.inputs), ("Outputs", &def.outputs)] {
        if ports.is_empty() {
            continue;
        }
        println!();
        println!("{heading}:");
        for port in ports {
            println!("  {}", describe_port(port));
        }
    }

    println!();
    let targets: Vec<&str> = def.templates.keys().map(String::as_str).collect();
    println!("Targets: {}", targets.join(", "));
}

fn describe_port(port: &PortDefinition) -> String {
    let mut text = format!("{:10} {} {}", port.label, port.domain.as_str(), port.dtype);
    if port.vlen != "1" {
        text.push_str(&format!(" vlen={}", port.vlen));
    }
    if port.multiplicity != "1" {
        text.push_str(&format!(
            " x{} ({}..{})",
            port.multiplicity, port.min_streams, port.max_streams
        ));
    }
    if port.optional {
        text.push_str(" optional");
    }
    text
}
