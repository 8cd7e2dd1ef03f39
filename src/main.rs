use std::{io::Write, time::UNIX_EPOCH};

use byte_unit::Byte;
use chainfs::{
    cli_interface::ChainFsCli,
    mount::{get_file, put_file, with_mounted},
    FsStats,
};
use clap::Parser;
use log::info;

/// a CLI interface to users to create a volume image,
/// or to mount one for the span of a single command
fn main() -> anyhow::Result<()> {
    env_logger::builder().format_timestamp_nanos().init();
    let args = ChainFsCli::parse();
    match args {
        ChainFsCli::Mkfs(args) => {
            chainfs::mkfs::mkfs(args.image_file_path)?;
        }
        ChainFsCli::Ls(args) => {
            let files = with_mounted(args.image_file_path, |fs| Ok(fs.files()?))?;
            for file in files {
                println!(
                    "{:<15} {:>10} {:>5} blocks",
                    file.name, file.size, file.blocks
                );
            }
        }
        ChainFsCli::Stat(args) => {
            let stats = with_mounted(args.image_file_path, |fs| Ok(fs.stats()?))?;
            print!("{}", render_stats(&stats));
        }
        ChainFsCli::Put(args) => {
            let content = std::fs::read(&args.source)?;
            with_mounted(args.image_file_path, |fs| put_file(fs, &args.name, &content))?;
            info!("stored {} bytes as {}", content.len(), args.name);
        }
        ChainFsCli::Get(args) => {
            let content = with_mounted(args.image_file_path, |fs| get_file(fs, &args.name))?;
            match args.output {
                Some(path) => std::fs::write(path, content)?,
                None => std::io::stdout().write_all(&content)?,
            }
        }
        ChainFsCli::Rm(args) => {
            with_mounted(args.image_file_path, |fs| Ok(fs.delete(&args.name)?))?;
        }
        ChainFsCli::Truncate(args) => {
            with_mounted(args.image_file_path, |fs| {
                let fd = fs.open(&args.name)?;
                let truncated = fs.truncate(fd, args.length);
                fs.close(fd)?;
                Ok(truncated?)
            })?;
        }
    }
    Ok(())
}

/// the `stat` report, every size rendered in bytes
fn render_stats(stats: &FsStats) -> String {
    let block_size = chainfs::BLOCK_SIZE as u64;
    let bytes = |blocks: usize| {
        Byte::from_bytes((blocks as u64 * block_size) as _).get_appropriate_unit(true)
    };
    let formatted_at = stats
        .formatted_at
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    format!(
        "space: {} used, {} free of {} ({} blocks)\nfiles: {} of {}\nformatted: {} seconds after the epoch\n",
        bytes(stats.total_blocks - stats.free_blocks),
        bytes(stats.free_blocks),
        bytes(stats.total_blocks),
        stats.total_blocks,
        stats.files,
        stats.max_files,
        formatted_at.as_secs()
    )
}
