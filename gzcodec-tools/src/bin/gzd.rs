// Copyright 2024 Karpeles Lab Inc.
// Gzip codec decompression command-line tool

use anyhow::{Context, Result};
use clap::Parser;
use gzcodec::{format, Codec, GZip};
use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "gzd")]
#[command(about = "Gzip codec decompression tool", long_about = None)]
#[command(version)]
struct Args {
    /// Input files to decompress
    #[arg(required = true)]
    files: Vec<String>,

    /// Write output to stdout (use with single file or -)
    #[arg(short = 'c', long)]
    stdout: bool,

    /// Output file (use with single input file)
    #[arg(short = 'o', long)]
    output: Option<PathBuf>,

    /// Do not overwrite existing files
    #[arg(long)]
    safe: bool,

    /// Delete source files after successful decompression
    #[arg(long)]
    rm: bool,

    /// Quiet mode - don't print progress
    #[arg(short = 'q', long)]
    quiet: bool,

    /// Verify files only, don't write output
    #[arg(long)]
    verify: bool,

    /// Decompress into a buffer of exactly this size (e.g., 92, 64K, 1M);
    /// fails if the data does not fit
    #[arg(long)]
    size: Option<String>,

    /// Print header and trailer fields instead of decompressing
    #[arg(long)]
    info: bool,

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

    let capacity = args
        .size
        .as_deref()
        .map(parse_size)
        .transpose()
        .context("Invalid --size")?;

    // Handle benchmark mode
    if let Some(bench_count) = args.bench {
        return run_benchmark(&args, bench_count);
    }

    if args.info {
        for file in &args.files {
            print_info(file)?;
        }
        return Ok(());
    }

    // Handle stdin/stdout case
    if args.files.len() == 1 && args.files[0] == "-" {
        return decompress_stdio(&args, capacity);
    }

    // Decompress each file
    for file in &args.files {
        decompress_file(file, &args, capacity)?;
    }

    Ok(())
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "gzcodec=debug,gzd=info" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn run_benchmark(args: &Args, iterations: usize) -> Result<()> {
    use std::time::Instant;

    let codec = GZip::default();
    for file_path in &args.files {
        if file_path == "-" {
            anyhow::bail!("Cannot benchmark stdin");
        }

        let input = PathBuf::from(file_path);
        let file_data = read_file(&input)?;

        println!(
            "Benchmarking {} ({} bytes compressed, {} iterations):",
            input.display(),
            file_data.len(),
            iterations
        );

        let start = Instant::now();
        let mut decompressed_size = 0;
        for _ in 0..iterations {
            decompressed_size = codec.decode(&file_data)?.len();
        }
        let elapsed = start.elapsed();

        let avg_time = elapsed.as_secs_f64() / iterations.max(1) as f64;
        let throughput = decompressed_size as f64 / avg_time / 1024.0 / 1024.0;

        println!(
            "  Average: {:.3}s per iteration ({:.2} MB/s decompressed)",
            avg_time, throughput
        );
    }

    Ok(())
}

fn print_info(file: &str) -> Result<()> {
    let data = if file == "-" {
        let mut data = Vec::new();
        io::stdin().lock().read_to_end(&mut data)?;
        data
    } else {
        read_file(Path::new(file))?
    };

    let header = format::inspect(&data).with_context(|| format!("Not a gzip file: {}", file))?;
    let trailer = format::trailer(&data)?;

    println!("{}:", file);
    println!("  flags:       0x{:02x}", header.flags);
    println!("  mtime:       {}", header.mtime);
    println!("  xfl:         {}", header.xfl);
    println!("  os:          {}", header.os);
    if let Some(ref name) = header.file_name {
        println!("  name:        {}", String::from_utf8_lossy(name));
    }
    if let Some(ref comment) = header.comment {
        println!("  comment:     {}", String::from_utf8_lossy(comment));
    }
    if let Some(ref extra) = header.extra {
        println!("  extra:       {} bytes", extra.len());
    }
    println!("  crc32:       0x{:08x}", trailer.crc32);
    println!("  size mod 2^32: {}", trailer.isize);
    println!("  compressed:  {}", data.len());
    Ok(())
}

/// Decode `payload` either into a growing buffer or into one of `capacity` bytes.
fn decode_payload(codec: &GZip, payload: &[u8], capacity: Option<usize>) -> Result<Vec<u8>> {
    let mut buffer = capacity.map(|n| vec![0u8; n]);
    let decoded = codec.decode_to(payload, buffer.as_deref_mut())?;
    Ok(gzcodec::ensure_owned(decoded))
}

fn decompress_stdio(args: &Args, capacity: Option<usize>) -> Result<()> {
    let mut data = Vec::new();
    io::stdin().lock().read_to_end(&mut data)?;

    let decompressed = decode_payload(&GZip::default(), &data, capacity)?;

    if args.verify {
        if !args.quiet {
            eprintln!("Verification successful");
        }
        return Ok(());
    }

    let stdout = io::stdout();
    let mut writer = stdout.lock();
    writer.write_all(&decompressed)?;
    writer.flush()?;
    Ok(())
}

fn output_path(input: &Path, args: &Args) -> Result<PathBuf> {
    if args.verify {
        // Don't write anything in verify mode
        Ok(PathBuf::from("-"))
    } else if let Some(ref out) = args.output {
        Ok(out.clone())
    } else if args.stdout {
        Ok(PathBuf::from("-"))
    } else {
        let path_str = input.to_string_lossy();
        match path_str.strip_suffix(".gz") {
            Some(stripped) if !stripped.is_empty() => Ok(PathBuf::from(stripped)),
            _ => anyhow::bail!("Input file must have .gz extension: {}", input.display()),
        }
    }
}

fn decompress_file(input_path: &str, args: &Args, capacity: Option<usize>) -> Result<()> {
    let input = PathBuf::from(input_path);

    if !input.is_file() {
        anyhow::bail!("Not a file: {}", input_path);
    }

    let output = output_path(&input, args)?;

    // Check if output exists in safe mode
    if args.safe && !args.verify && output != Path::new("-") && output.exists() {
        anyhow::bail!("Output file already exists: {}", output.display());
    }

    let data = read_file(&input)?;
    let decompressed = decode_payload(&GZip::default(), &data, capacity)
        .with_context(|| format!("Decompression failed: {}", input.display()))?;

    info!(
        input = %input.display(),
        input_len = data.len(),
        output_len = decompressed.len(),
        "decompressed"
    );

    if args.verify {
        // Only an unpadded single-member payload ends with the checksum of the whole output
        let trailer = format::trailer(&data)?;
        if !trailer.matches(&decompressed) && !args.quiet {
            eprintln!(
                "Note: {} has several members or padding; trailer check skipped",
                input.display()
            );
        }
        if !args.quiet {
            println!("Verification successful: {}", input.display());
        }
    } else if output == Path::new("-") {
        io::stdout().write_all(&decompressed)?;
    } else {
        let mut output_file = File::create(&output)
            .with_context(|| format!("Failed to create output file: {}", output.display()))?;
        output_file.write_all(&decompressed)?;
    }

    // Print decompression stats
    if !args.quiet && !args.stdout && !args.verify && !decompressed.is_empty() {
        let ratio = (data.len() as f64 / decompressed.len() as f64) * 100.0;
        println!(
            "{} -> {} (compressed to {:.2}%)",
            input.display(),
            output.display(),
            ratio
        );
    }

    // Remove source file if requested
    if args.rm && output != Path::new("-") && !args.verify {
        fs::remove_file(&input)
            .with_context(|| format!("Failed to remove source file: {}", input.display()))?;
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

fn parse_size(s: &str) -> Result<usize> {
    let s = s.trim().to_uppercase();

    let (num, unit) = if let Some(num) = s.strip_suffix('K') {
        (num, 1usize << 10)
    } else if let Some(num) = s.strip_suffix('M') {
        (num, 1 << 20)
    } else if let Some(num) = s.strip_suffix('G') {
        (num, 1 << 30)
    } else {
        (s.as_str(), 1)
    };

    let num = num.parse::<usize>().context("Invalid size format")?;
    num.checked_mul(unit)
        .with_context(|| format!("Size too large: {}", s))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args_for(argv: &[&str]) -> Args {
        let mut full = vec!["gzd"];
        full.extend_from_slice(argv);
        Args::parse_from(full)
    }

    #[test]
    fn test_parse_size() {
        assert_eq!(parse_size("92").unwrap(), 92);
        assert_eq!(parse_size("64k").unwrap(), 64 * 1024);
        assert_eq!(parse_size("1M").unwrap(), 1024 * 1024);
        assert!(parse_size("lots").is_err());
    }

    #[test]
    fn test_parse_size_overflow() {
        assert!(parse_size(&format!("{}K", usize::MAX)).is_err());
        assert!(parse_size(&format!("{}G", usize::MAX / 1024)).is_err());
        assert_eq!(parse_size(&usize::MAX.to_string()).unwrap(), usize::MAX);
    }

    #[test]
    fn test_output_path_strips_gz() {
        let args = args_for(&["x"]);
        assert_eq!(
            output_path(Path::new("dir/a.bin.gz"), &args).unwrap(),
            PathBuf::from("dir/a.bin")
        );
        assert!(output_path(Path::new("dir/a.bin"), &args).is_err());
    }

    #[test]
    fn test_decode_payload_with_capacity() {
        let codec = GZip::new(1);
        let payload = codec.encode(b"ABC").unwrap();

        assert_eq!(decode_payload(&codec, &payload, None).unwrap(), b"ABC");
        assert_eq!(decode_payload(&codec, &payload, Some(3)).unwrap(), b"ABC");
        assert_eq!(decode_payload(&codec, &payload, Some(100)).unwrap(), b"ABC");

        let err = decode_payload(&codec, &payload, Some(2)).unwrap_err();
        assert_eq!(
            err.downcast_ref::<gzcodec::Error>(),
            Some(&gzcodec::Error::BufferTooSmall { capacity: 2 })
        );
    }

    #[test]
    fn test_decompress_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let packed = dir.path().join("data.bin.gz");
        fs::write(&packed, GZip::new(9).encode(b"file contents").unwrap()).unwrap();

        let args = args_for(&["-q", packed.to_str().unwrap()]);
        decompress_file(packed.to_str().unwrap(), &args, None).unwrap();
        assert_eq!(fs::read(dir.path().join("data.bin")).unwrap(), b"file contents");
    }
}
