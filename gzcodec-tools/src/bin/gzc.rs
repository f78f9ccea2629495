// Copyright 2024 Karpeles Lab Inc.
// Gzip codec compression command-line tool

use anyhow::{Context, Result};
use clap::Parser;
use gzcodec::{encode_all, GZip, DEFAULT_LEVEL};
use indicatif::{ProgressBar, ProgressStyle};
use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "gzc")]
#[command(about = "Gzip codec compression tool", long_about = None)]
#[command(version)]
struct Args {
    /// Input files to compress
    #[arg(required = true)]
    files: Vec<String>,

    /// Write output to stdout (use with single file or -)
    #[arg(short = 'c', long)]
    stdout: bool,

    /// Output file (use with single input file)
    #[arg(short = 'o', long)]
    output: Option<PathBuf>,

    /// Compression level (0-9, -1 for the library default)
    #[arg(short = 'l', long, default_value_t = DEFAULT_LEVEL, allow_negative_numbers = true)]
    level: i32,

    /// Do not overwrite existing files
    #[arg(long)]
    safe: bool,

    /// Delete source files after successful compression
    #[arg(long)]
    rm: bool,

    /// Quiet mode - don't print progress
    #[arg(short = 'q', long)]
    quiet: bool,

    /// Verify written files by decompressing them
    #[arg(long)]
    verify: bool,

    /// Run benchmark n times (no output will be written)
    #[arg(long)]
    bench: Option<usize>,

    /// Log codec activity to stderr
    #[arg(short = 'v', long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    // Validate arguments
    if args.files.len() > 1 && args.output.is_some() {
        anyhow::bail!("Cannot use -o with multiple input files");
    }

    if args.files.len() > 1 && args.stdout {
        anyhow::bail!("Cannot use -c with multiple input files");
    }

    let codec = GZip::new(args.level);

    // Handle benchmark mode
    if let Some(bench_count) = args.bench {
        return run_benchmark(&args, &codec, bench_count);
    }

    // Handle stdin/stdout case
    if args.files.len() == 1 && args.files[0] == "-" {
        return compress_stdio(&codec);
    }

    compress_files(&args, &codec)
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "gzcodec=debug,gzc=info" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn run_benchmark(args: &Args, codec: &GZip, iterations: usize) -> Result<()> {
    use std::time::Instant;

    for file_path in &args.files {
        if file_path == "-" {
            anyhow::bail!("Cannot benchmark stdin");
        }

        let input = PathBuf::from(file_path);
        let file_data = read_file(&input)?;
        let file_size = file_data.len();

        println!(
            "Benchmarking {} ({} bytes, {} iterations, {}):",
            input.display(),
            file_size,
            iterations,
            codec
        );

        let start = Instant::now();
        let mut compressed_size = 0;
        for _ in 0..iterations {
            compressed_size = codec.encode(&file_data)?.len();
        }
        let elapsed = start.elapsed();

        let avg_time = elapsed.as_secs_f64() / iterations.max(1) as f64;
        let throughput = file_size as f64 / avg_time / 1024.0 / 1024.0;

        println!(
            "  Average: {:.3}s per iteration ({:.2} MB/s, {} bytes out)",
            avg_time, throughput, compressed_size
        );
    }

    Ok(())
}

fn compress_stdio(codec: &GZip) -> Result<()> {
    let mut data = Vec::new();
    io::stdin().lock().read_to_end(&mut data)?;

    let compressed = codec.encode(&data)?;

    let stdout = io::stdout();
    let mut writer = stdout.lock();
    writer.write_all(&compressed)?;
    writer.flush()?;
    Ok(())
}

fn output_path(input: &Path, args: &Args) -> PathBuf {
    if let Some(ref out) = args.output {
        out.clone()
    } else if args.stdout {
        PathBuf::from("-")
    } else {
        let mut name = input.as_os_str().to_owned();
        name.push(".gz");
        PathBuf::from(name)
    }
}

fn compress_files(args: &Args, codec: &GZip) -> Result<()> {
    let mut jobs = Vec::with_capacity(args.files.len());
    for file in &args.files {
        let input = PathBuf::from(file);
        if !input.is_file() {
            anyhow::bail!("Not a file: {}", file);
        }

        let output = output_path(&input, args);
        // Check if output exists in safe mode
        if args.safe && output != Path::new("-") && output.exists() {
            anyhow::bail!("Output file already exists: {}", output.display());
        }
        jobs.push((input, output));
    }

    let inputs = jobs
        .iter()
        .map(|(input, _)| read_file(input))
        .collect::<Result<Vec<_>>>()?;

    // Every file is an independent buffer, so they are encoded in parallel
    let compressed = encode_all(codec, &inputs)?;

    let pb = if !args.quiet && !args.stdout {
        let pb = ProgressBar::new(jobs.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files {msg}")?
                .progress_chars("#>-"),
        );
        Some(pb)
    } else {
        None
    };

    for (((input, output), data), payload) in jobs.iter().zip(&inputs).zip(&compressed) {
        if output == Path::new("-") {
            io::stdout().write_all(payload)?;
        } else {
            let mut output_file = File::create(output)
                .with_context(|| format!("Failed to create output file: {}", output.display()))?;
            output_file.write_all(payload)?;
        }

        if let Some(ref pb) = pb {
            pb.set_message(input.display().to_string());
            pb.inc(1);
        }

        info!(
            input = %input.display(),
            input_len = data.len(),
            output_len = payload.len(),
            "compressed"
        );

        // Print compression stats
        if !args.quiet && !args.stdout && !data.is_empty() {
            let ratio = (payload.len() as f64 / data.len() as f64) * 100.0;
            println!(
                "{} -> {} ({:.2}%)",
                input.display(),
                output.display(),
                ratio
            );
        }

        // Verify compressed file if requested
        if args.verify && output != Path::new("-") {
            verify_compressed_file(codec, data, output)?;
        }

        // Remove source file if requested
        if args.rm && output != Path::new("-") {
            fs::remove_file(input)
                .with_context(|| format!("Failed to remove source file: {}", input.display()))?;
        }
    }

    if let Some(pb) = pb {
        pb.finish_with_message("Done");
    }

    Ok(())
}

fn verify_compressed_file(codec: &GZip, original: &[u8], compressed: &Path) -> Result<()> {
    let payload = read_file(compressed)?;

    // Decode into a buffer of exactly the original size; any excess is an error
    let mut decoded = vec![0u8; original.len()];
    let written = codec.decode_into(&payload, &mut decoded).with_context(|| {
        format!(
            "Failed to decompress file for verification: {}",
            compressed.display()
        )
    })?;

    if written != original {
        anyhow::bail!(
            "Verification failed: decompressed data does not match original (original: {} bytes, decompressed: {} bytes)",
            original.len(),
            written.len()
        );
    }

    Ok(())
}

fn read_file(path: &Path) -> Result<Vec<u8>> {
    let mut data = Vec::new();
    File::open(path)
        .with_context(|| format!("Failed to open file: {}", path.display()))?
        .read_to_end(&mut data)?;
    Ok(data)
}
