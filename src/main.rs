use std::env;

use anyhow::Context;

use policychat_retrieval::core::logging;
use policychat_retrieval::{Evidence, PolicyRecords, RetrievalConfig, RetrievalService};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config_path = RetrievalConfig::config_path();
    let config = RetrievalConfig::load(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;
    logging::init(&config.log_dir);

    let mut args = env::args().skip(1);
    let (Some(jurisdiction), Some(question)) = (args.next(), args.next()) else {
        eprintln!("usage: policychat-retrieval <jurisdiction> <question> [category]");
        std::process::exit(2);
    };
    let category = args.next().unwrap_or_else(|| "all".to_string());

    let records = match &config.policy_records_path {
        Some(path) => PolicyRecords::load(path)
            .with_context(|| format!("Failed to load policy records from {}", path.display()))?,
        None => PolicyRecords::default(),
    };

    let service =
        RetrievalService::from_config(&config).context("Failed to build retrieval service")?;

    let evidence = service
        .gather(&jurisdiction, &question, &category, &records)
        .await
        .context("Retrieval failed")?;

    match &evidence {
        Evidence::Semantic { results, context } => {
            tracing::info!("Answering from {} embedded chunks", results.len());
            println!("{context}");
        }
        Evidence::Documents { documents } => {
            tracing::info!("Answering from {} live documents", documents.len());
            for doc in documents {
                println!("== {} ({}, {} chars)", doc.url, doc.kind, doc.size);
            }
        }
        Evidence::None => {
            println!("No grounding available; answering from summaries only.");
        }
    }

    for citation in evidence.citations() {
        eprintln!("citation: {}", citation.source);
    }

    Ok(())
}
