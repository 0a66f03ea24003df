//! Subcommand implementations.

use std::fmt::Write as _;
use std::io;
use std::path::Path;

use anyhow::{Context, Result};
use fncall_builder::{Builder, read_listing};
use fncall_config::{FunctionsConfig, Layout};
use fncall_primitives::SchemaDocument;
use fncall_runtime::{Checker, Dispatcher, InvokeError};
use serde_json::{Map, Value};
use tokio::fs;
use tracing::info;

use crate::cli::{ListArgs, RunArgs};

/// Regenerates every schema document and prints the summary.
///
/// Returns exit status 1 only when every attempted artifact failed.
pub async fn build(config: &FunctionsConfig) -> Result<u8> {
    let report = Builder::new(Layout::new(config)).build_all().await;
    println!("{report}");
    Ok(if report.is_total_failure() { 1 } else { 0 })
}

/// Runs one invocation and prints its output.
pub async fn run(config: &FunctionsConfig, args: RunArgs) -> Result<u8> {
    let request = args.into_request()?;
    let output = Dispatcher::new(config).invoke(&request).await?;
    if !output.output.is_empty() {
        if output.output.ends_with('\n') {
            print!("{}", output.output);
        } else {
            println!("{}", output.output);
        }
    }
    Ok(0)
}

/// Prints the readiness report. Findings never change the exit status.
pub async fn check(config: &FunctionsConfig) -> Result<u8> {
    let report = Checker::new(config).run().await;
    println!("{report}");
    Ok(0)
}

/// Lists declarations from the built documents.
pub async fn list(config: &FunctionsConfig, args: &ListArgs) -> Result<u8> {
    let layout = Layout::new(config);
    let rendered = match &args.agent {
        Some(agent) => {
            let path = layout.agent_functions_path(agent);
            let document = read_document(&path)
                .await?
                .ok_or(InvokeError::SchemaUnavailable { path })?;
            if args.json {
                document.to_json_pretty()?
            } else {
                lines(Some(agent.as_str()), &document)
            }
        }
        None => list_all(&layout, args.json).await?,
    };
    print!("{rendered}");
    Ok(0)
}

async fn list_all(layout: &Layout, json: bool) -> Result<String> {
    let tools = read_document(&layout.functions_path()).await?;
    let agents_listing = layout.agents_listing();
    let agents = read_listing(&agents_listing)
        .await
        .with_context(|| format!("failed to read `{}`", agents_listing.display()))?
        .unwrap_or_default();

    let mut agent_documents = Vec::new();
    for agent in agents {
        if let Some(document) = read_document(&layout.agent_functions_path(&agent)).await? {
            agent_documents.push((agent, document));
        } else {
            info!(agent = %agent, "agent has no schema document; skipped");
        }
    }

    if json {
        let mut by_agent = Map::new();
        for (agent, document) in &agent_documents {
            by_agent.insert(agent.clone(), serde_json::to_value(document)?);
        }
        let tools = match &tools {
            Some(document) => serde_json::to_value(document)?,
            None => Value::Array(Vec::new()),
        };
        let mut root = Map::new();
        root.insert("tools".to_owned(), tools);
        root.insert("agents".to_owned(), Value::Object(by_agent));
        let mut text = serde_json::to_string_pretty(&Value::Object(root))?;
        text.push('\n');
        return Ok(text);
    }

    let mut text = String::new();
    if let Some(document) = &tools {
        text.push_str(&lines(None, document));
    }
    for (agent, document) in &agent_documents {
        text.push_str(&lines(Some(agent.as_str()), document));
    }
    Ok(text)
}

fn lines(agent: Option<&str>, document: &SchemaDocument) -> String {
    let mut text = String::new();
    for declaration in document.iter() {
        let description = declaration.description().lines().next().unwrap_or_default();
        let _ = match agent {
            Some(agent) => writeln!(text, "{agent}.{}\t{description}", declaration.name()),
            None => writeln!(text, "{}\t{description}", declaration.name()),
        };
    }
    text
}

async fn read_document(path: &Path) -> Result<Option<SchemaDocument>> {
    let content = match fs::read_to_string(path).await {
        Ok(content) => content,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(InvokeError::Io { path: path.to_path_buf(), source: err }.into()),
    };
    let document = SchemaDocument::from_json_str(&content).map_err(|source| InvokeError::Document {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(Some(document))
}
