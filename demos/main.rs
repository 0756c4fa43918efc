use std::env;

use anyhow::{Context, Result};
use chat_stats::{AnalysisConfig, ChatStatistics, DEFAULT_TOP_N, WordCloudOptions};
use tracing_subscriber::EnvFilter;

/// Usage: main <result.json> <output dir> [font.ttf] [stopwords.txt]
fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args: Vec<String> = env::args().collect();
    let chat_path = args.get(1).context("missing path to the chat export")?;
    let output_dir = args.get(2).map(String::as_str).unwrap_or(".");

    let config = match args.get(4) {
        Some(path) => AnalysisConfig::load(path)?,
        None => AnalysisConfig::default(),
    };
    let stats = ChatStatistics::from_file(chat_path, &config)?;

    let mut options = WordCloudOptions::default();
    if let Some(font) = args.get(3) {
        options.font_path = font.into();
    }
    match stats.generate_word_cloud(output_dir, &options) {
        Ok(path) => println!("Word cloud written to {}", path.display()),
        Err(e) => eprintln!("Could not generate the word cloud: {}", e),
    }

    println!("Users by replies to questions:");
    for (user, count) in stats.top_users(DEFAULT_TOP_N) {
        println!("{}: {}", user, count);
    }

    Ok(())
}
