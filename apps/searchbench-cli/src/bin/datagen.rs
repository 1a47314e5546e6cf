//! Generates a synthetic product corpus in the JSONL layout the
//! benchmark ingests. Deterministic for a fixed argument set, so two
//! machines can benchmark the same data.

use std::env;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use anyhow::Context;
use indicatif::{ProgressBar, ProgressStyle};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde_json::json;

const DEFAULT_COUNT: usize = 5000;
const DEFAULT_OUTPUT: &str = "data/products.jsonl";
const DEFAULT_DIM: usize = 384;
const SEED: u64 = 42;

const ADJECTIVES: &[&str] = &[
    "compact", "rugged", "lightweight", "ergonomic", "wireless", "foldable", "insulated",
    "adjustable", "portable", "heavy-duty", "rechargeable", "waterproof",
];
const MATERIALS: &[&str] = &[
    "steel", "walnut", "bamboo", "aluminum", "leather", "ceramic", "carbon", "canvas",
    "silicone", "oak",
];
const NOUNS: &[&str] = &[
    "desk lamp", "water bottle", "backpack", "keyboard", "office chair", "headphones",
    "coffee grinder", "monitor stand", "tool kit", "camping stove", "notebook", "speaker",
];
const CATEGORIES: &[&str] = &[
    "electronics", "home", "outdoors", "office", "kitchen", "fitness", "tools", "travel",
];
const BRANDS: &[&str] = &[
    "Northway", "Vexel", "Ardent", "Bluepine", "Crestline", "Omya", "Ferrostrand", "Kelda",
];
const DETAILS: &[&str] = &[
    "a reinforced base", "quick-release fittings", "an anti-slip grip", "all-day battery life",
    "tool-free assembly", "a travel pouch", "splash resistance", "a two-year warranty",
    "low-noise operation", "modular attachments",
];

fn main() -> anyhow::Result<()> {
    let args: Vec<String> = env::args().collect();
    let count: usize = match args.get(1) {
        Some(raw) => raw.parse().context("count must be a number")?,
        None => DEFAULT_COUNT,
    };
    let output = args
        .get(2)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT));
    let dim: usize = match args.get(3) {
        Some(raw) => raw.parse().context("dim must be a number")?,
        None => DEFAULT_DIM,
    };

    if let Some(parent) = output.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
    }
    let file = File::create(&output)
        .with_context(|| format!("creating {}", output.display()))?;
    let mut writer = BufWriter::new(file);

    let pb = ProgressBar::new(count as u64);
    let style = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} docs ({percent}%)")?
        .progress_chars("#>-");
    pb.set_style(style);

    let mut rng = StdRng::seed_from_u64(SEED);
    for id in 0..count {
        let doc = synth_document(&mut rng, id as u64, dim);
        serde_json::to_writer(&mut writer, &doc)?;
        writer.write_all(b"\n")?;
        pb.inc(1);
    }
    writer.flush()?;
    pb.finish();

    println!("✅ Wrote {count} documents to {}", output.display());
    Ok(())
}

fn synth_document(rng: &mut StdRng, id: u64, dim: usize) -> serde_json::Value {
    let brand = choose(rng, BRANDS);
    let adjective = choose(rng, ADJECTIVES);
    let material = choose(rng, MATERIALS);
    let noun = choose(rng, NOUNS);
    let title = format!("{brand} {adjective} {material} {noun}");
    let description = format!(
        "{title} with {} and {}.",
        choose(rng, DETAILS),
        choose(rng, DETAILS)
    );
    json!({
        "id": id,
        "fields": {
            "title": title,
            "description": description,
            "category": choose(rng, CATEGORIES),
            "brand": brand,
            "rating_number": rng.gen_range(0..5000),
            "average_rating": f64::from(rng.gen_range(10..=50)) / 10.0,
            "price": f64::from(rng.gen_range(199..=99_999)) / 100.0,
        },
        "embedding": unit_vector(rng, dim),
    })
}

fn choose<'a>(rng: &mut StdRng, words: &'a [&'a str]) -> &'a str {
    words.choose(rng).copied().unwrap_or("")
}

fn unit_vector(rng: &mut StdRng, dim: usize) -> Vec<f32> {
    let mut vector: Vec<f32> = (0..dim).map(|_| rng.gen_range(-1.0f32..1.0)).collect();
    let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > 0.0 {
        for v in &mut vector {
            *v /= norm;
        }
    }
    vector
}
