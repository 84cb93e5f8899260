//! fillcache CLI
//!
//! Command-line interface for exercising the fillcache TTL cache and the
//! streaming cipher.

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::time::{Duration, Instant};

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use fillcache_cache::{Cache, CacheConfig};
use fillcache_core::ErrorList;
use fillcache_crypto::{CipherReader, CipherWriter};
use fillcache_sync::{BufferPool, Closer};

/// fillcache - stampede-safe TTL memoization cache
#[derive(Parser)]
#[command(name = "fillcache")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// JSON file with cache configuration
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Sweeper interval in milliseconds (0 disables sweeping)
    #[arg(long, global = true, env = "FILLCACHE_PURGE_INTERVAL")]
    purge_interval_ms: Option<u64>,

    /// Default TTL in seconds
    #[arg(long, global = true, env = "FILLCACHE_TTL")]
    ttl: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show stampede protection and expiry in action
    Demo {
        /// Number of concurrent callers
        #[arg(short, long, default_value = "16")]
        threads: usize,
    },

    /// Measure lookup throughput
    Bench {
        /// Number of distinct keys
        #[arg(short, long, default_value = "1000")]
        keys: usize,
        /// Number of worker threads
        #[arg(short, long, default_value = "4")]
        threads: usize,
        /// Lookups per thread
        #[arg(short, long, default_value = "100000")]
        ops: usize,
    },

    /// Encrypt a file
    Encrypt {
        /// File to encrypt
        input: PathBuf,
        /// Where to write the ciphertext
        output: PathBuf,
        /// Hex-encoded AES key (16, 24 or 32 bytes)
        #[arg(short, long, env = "FILLCACHE_KEY")]
        key: String,
    },

    /// Decrypt a file produced by `encrypt`
    Decrypt {
        /// File to decrypt
        input: PathBuf,
        /// Where to write the plaintext
        output: PathBuf,
        /// Hex-encoded AES key (16, 24 or 32 bytes)
        #[arg(short, long, env = "FILLCACHE_KEY")]
        key: String,
    },

    /// Keep a sweeping cache alive and log its stats until interrupted
    Watch {
        /// Number of keys to rotate through
        #[arg(short, long, default_value = "8")]
        keys: usize,
        /// Stop after this many seconds instead of waiting for a signal
        #[arg(short, long)]
        duration: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        "fillcache=debug,info"
    } else {
        "fillcache=info,warn"
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = load_config(&cli)?;

    match cli.command {
        Commands::Demo { threads } => cmd_demo(config, threads),
        Commands::Bench { keys, threads, ops } => cmd_bench(config, keys, threads, ops),
        Commands::Encrypt { input, output, key } => cmd_encrypt(&input, &output, &key),
        Commands::Decrypt { input, output, key } => cmd_decrypt(&input, &output, &key),
        Commands::Watch { keys, duration } => cmd_watch(config, keys, duration).await,
    }
}

/// Builds the cache configuration: file first, then flags and environment.
fn load_config(cli: &Cli) -> Result<CacheConfig> {
    let mut config = match &cli.config {
        Some(path) => {
            let file = File::open(path)
                .with_context(|| format!("Failed to open config file {}", path.display()))?;
            serde_json::from_reader(file).context("Invalid cache configuration")?
        }
        None => CacheConfig::default(),
    };

    if let Some(interval) = cli.purge_interval_ms {
        config.purge_interval_ms = interval;
    }
    if let Some(ttl) = cli.ttl {
        config.default_ttl_seconds = ttl;
    }
    Ok(config)
}

/// Stampede and expiry demonstration
fn cmd_demo(config: CacheConfig, threads: usize) -> Result<()> {
    let threads = threads.max(1);
    let ttl = config.default_ttl();
    println!(
        "{} {} callers, TTL {}s",
        "🧪 Stampede demo:".cyan().bold(),
        threads,
        ttl.as_secs()
    );

    let cache: Cache<u64, String> = Cache::with_config(config);
    let fills = Arc::new(AtomicUsize::new(0));
    let barrier = Barrier::new(threads);

    let results = std::thread::scope(|s| {
        let handles: Vec<_> = (0..threads)
            .map(|_| {
                s.spawn(|| {
                    barrier.wait();
                    let fills = Arc::clone(&fills);
                    cache.get(
                        "expensive",
                        move || {
                            fills.fetch_add(1, Ordering::SeqCst);
                            std::thread::sleep(Duration::from_millis(200));
                            Ok(42)
                        },
                        ttl,
                    )
                })
            })
            .collect();

        handles
            .into_iter()
            .map(|handle| handle.join().map_err(|_| anyhow!("demo caller panicked")))
            .collect::<Result<Vec<_>>>()
    })?;

    let agreeing = results.iter().filter(|r| **r == Ok(42)).count();
    println!("   ✓ {} callers received the value", agreeing);
    println!("   ✓ Filler ran {} time(s)", fills.load(Ordering::SeqCst));

    println!("\n{}", "⏳ Expiry demo:".cyan().bold());
    cache.get("short-lived", || Ok(1), Duration::from_secs(1)).ok();
    std::thread::sleep(Duration::from_millis(1_100));
    let before = cache.stats().fills;
    cache.get("short-lived", || Ok(2), Duration::from_secs(1)).ok();
    println!(
        "   ✓ Expired entry refilled ({} new fill)",
        cache.stats().fills - before
    );

    let stats = cache.stats();
    println!("\n{}", "📈 Stats:".green().bold());
    println!("{}", serde_json::to_string_pretty(&stats)?);

    Ok(())
}

/// Lookup throughput benchmark
fn cmd_bench(config: CacheConfig, keys: usize, threads: usize, ops: usize) -> Result<()> {
    let keys = keys.max(1);
    let threads = threads.max(1);
    println!(
        "{} {} keys, {} threads, {} lookups each",
        "📊 Benchmarking with".cyan().bold(),
        keys,
        threads,
        ops
    );

    let ttl = config.default_ttl();
    let cache: Cache<usize, String> = Cache::with_config(config);

    let pb = ProgressBar::new((threads * ops) as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("   [{bar:40.cyan/blue}] {pos}/{len} ({eta})")?
            .progress_chars("#>-"),
    );

    let start = Instant::now();
    std::thread::scope(|s| {
        for t in 0..threads {
            let cache = &cache;
            let pb = pb.clone();
            s.spawn(move || {
                for i in 0..ops {
                    let key = (t * 7_919 + i) % keys;
                    let _ = cache.get(&format!("key-{key}"), move || Ok(key * 2), ttl);
                    pb.inc(1);
                }
            });
        }
    });
    pb.finish();
    let elapsed = start.elapsed();

    let total = threads * ops;
    let stats = cache.stats();
    println!("\n{}", "📈 Results:".green().bold());
    println!("   Lookups: {} in {:?}", total, elapsed);
    println!(
        "   Rate: {:.0} lookups/sec",
        total as f64 / elapsed.as_secs_f64()
    );
    println!("   Hits: {}  Fills: {}", stats.hits, stats.fills);

    if stats.fills as usize == keys.min(total) {
        println!("   {} Exactly one fill per key", "✅".green());
    } else {
        println!(
            "   {} Expected {} fills, saw {}",
            "❌".red(),
            keys.min(total),
            stats.fills
        );
    }

    Ok(())
}

/// Encrypt a file
fn cmd_encrypt(input: &Path, output: &Path, key: &str) -> Result<()> {
    let key = parse_key(key)?;
    let pool = BufferPool::default();
    let bytes = encrypt_file(input, output, &key, &pool)?;
    println!(
        "{} {} bytes → {}",
        "🔒 Encrypted".green().bold(),
        bytes,
        output.display()
    );
    Ok(())
}

/// Decrypt a file
fn cmd_decrypt(input: &Path, output: &Path, key: &str) -> Result<()> {
    let key = parse_key(key)?;
    let pool = BufferPool::default();
    let bytes = decrypt_file(input, output, &key, &pool)?;
    println!(
        "{} {} bytes → {}",
        "🔓 Decrypted".green().bold(),
        bytes,
        output.display()
    );
    Ok(())
}

/// Keep a sweeping cache alive until shutdown
async fn cmd_watch(config: CacheConfig, keys: usize, duration: Option<u64>) -> Result<()> {
    let keys = keys.max(1);
    println!(
        "{} sweep every {}ms, TTL {}s",
        "👀 Watching cache:".cyan().bold(),
        config.purge_interval_ms,
        config.default_ttl_seconds
    );
    println!("\n   Press Ctrl+C to stop.\n");

    let closer = Closer::new();
    if let Some(secs) = duration {
        let timer = closer.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(secs)).await;
            timer.close();
        });
    }

    let ttl = config.default_ttl();
    let cache: Cache<String, String> = Cache::with_config(config);
    let mut ticker = tokio::time::interval(Duration::from_secs(1));
    let mut tick = 0usize;

    loop {
        tokio::select! {
            closed = closer.wait() => {
                if let Err(err) = closed {
                    warn!(error = %err, "Closed with error");
                }
                break;
            }
            _ = ticker.tick() => {
                let key = format!("key-{}", tick % keys);
                tick += 1;

                let value = cache.get(&key, || Ok(chrono::Utc::now().to_rfc3339()), ttl);
                let stats = cache.stats();
                info!(
                    key = %key,
                    value = ?value,
                    entries = stats.total_entries,
                    expired = stats.expired_entries,
                    hits = stats.hits,
                    fills = stats.fills,
                    swept = stats.swept,
                    "Tick"
                );
            }
        }
    }

    cache.shutdown();
    println!("\n{}", "📈 Final stats:".green().bold());
    println!("{}", serde_json::to_string_pretty(&cache.stats())?);
    Ok(())
}

fn parse_key(key: &str) -> Result<Vec<u8>> {
    hex::decode(key.trim()).context("Key must be hex-encoded")
}

fn encrypt_file(input: &Path, output: &Path, key: &[u8], pool: &BufferPool) -> Result<u64> {
    let mut reader = BufReader::new(
        File::open(input).with_context(|| format!("Failed to open {}", input.display()))?,
    );
    let out = File::create(output)
        .with_context(|| format!("Failed to create {}", output.display()))?;
    let mut writer =
        CipherWriter::new(BufWriter::new(out), key).context("Failed to set up encryption")?;

    let copied = pump(&mut reader, &mut writer, pool)?;

    let errors = ErrorList::new();
    errors.push_result(writer.flush());
    errors.push_result(writer.close());
    errors.into_result().map_err(|err| anyhow!(err))?;
    Ok(copied)
}

fn decrypt_file(input: &Path, output: &Path, key: &[u8], pool: &BufferPool) -> Result<u64> {
    let file =
        File::open(input).with_context(|| format!("Failed to open {}", input.display()))?;
    let mut reader =
        CipherReader::new(BufReader::new(file), key).context("Failed to set up decryption")?;
    let mut writer = BufWriter::new(
        File::create(output).with_context(|| format!("Failed to create {}", output.display()))?,
    );

    let copied = pump(&mut reader, &mut writer, pool)?;

    let errors = ErrorList::new();
    errors.push_result(writer.flush());
    errors.push_result(reader.close());
    errors.into_result().map_err(|err| anyhow!(err))?;
    Ok(copied)
}

/// Copies `reader` into `writer` through a pooled buffer.
fn pump<R: Read, W: Write>(reader: &mut R, writer: &mut W, pool: &BufferPool) -> Result<u64> {
    let mut buf = pool.get();
    buf.resize(pool.buffer_capacity(), 0);

    let mut total = 0u64;
    loop {
        let n = match reader.read(&mut buf[..]) {
            Ok(0) => break,
            Ok(n) => n,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => return Err(err.into()),
        };
        writer.write_all(&buf[..n])?;
        total += n as u64;
    }
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: &str = "000102030405060708090a0b0c0d0e0f";

    #[test]
    fn test_encrypt_then_decrypt_file() {
        let dir = tempfile::tempdir().unwrap();
        let plain = dir.path().join("plain.txt");
        let sealed = dir.path().join("plain.enc");
        let restored = dir.path().join("plain.out");

        let content: Vec<u8> = (0..100_000u32).map(|i| (i % 251) as u8).collect();
        std::fs::write(&plain, &content).unwrap();

        let key = parse_key(KEY).unwrap();
        let pool = BufferPool::new(4096);
        assert_eq!(encrypt_file(&plain, &sealed, &key, &pool).unwrap(), 100_000);
        assert_eq!(decrypt_file(&sealed, &restored, &key, &pool).unwrap(), 100_000);

        let sealed_bytes = std::fs::read(&sealed).unwrap();
        assert_eq!(sealed_bytes.len(), 100_000 + 16);
        assert_eq!(std::fs::read(&restored).unwrap(), content);
        assert_eq!(pool.idle(), 1);
    }

    #[test]
    fn test_bad_key_is_rejected() {
        assert!(parse_key("not hex").is_err());

        let dir = tempfile::tempdir().unwrap();
        let plain = dir.path().join("plain.txt");
        std::fs::write(&plain, b"data").unwrap();

        let short = parse_key("0011").unwrap();
        let result = encrypt_file(&plain, &dir.path().join("out"), &short, &BufferPool::new(64));
        assert!(result.is_err());
    }

    #[test]
    fn test_load_config_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");
        std::fs::write(&path, r#"{ "purge_interval_ms": 250 }"#).unwrap();

        let cli = Cli::parse_from([
            "fillcache",
            "--config",
            path.to_str().unwrap(),
            "--ttl",
            "9",
            "demo",
        ]);
        let config = load_config(&cli).unwrap();
        assert_eq!(config.purge_interval_ms, 250);
        assert_eq!(config.default_ttl_seconds, 9);
    }
}
