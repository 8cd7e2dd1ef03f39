use clap::Parser;

#[derive(Parser, Debug, PartialEq)]
#[command(author, version, about, long_about)]
pub enum ChainFsCli {
    /// create a new, empty volume image
    Mkfs(ImageArgs),
    /// list the files of a volume
    Ls(ImageArgs),
    /// show usage statistics of a volume
    Stat(ImageArgs),
    /// copy a host file into a volume
    Put(PutArgs),
    /// copy a file out of a volume
    Get(GetArgs),
    /// delete a file from a volume
    Rm(FileArgs),
    /// cut a file down to a given length
    Truncate(TruncateArgs),
}

/// subcommands that only need a volume
#[derive(clap::Args, Debug, PartialEq)]
pub struct ImageArgs {
    /// the path of the volume image file
    #[clap(short = 'p', long)]
    pub image_file_path: String,
}

#[derive(clap::Args, Debug, PartialEq)]
#[command(about = "copy a host file into a volume")]
pub struct PutArgs {
    /// the path of the volume image file
    #[clap(short = 'p', long)]
    pub image_file_path: String,
    /// the file name inside the volume
    #[clap(short, long)]
    pub name: String,
    /// the host file to copy from
    #[clap(short, long)]
    pub source: String,
}

#[derive(clap::Args, Debug, PartialEq)]
#[command(about = "copy a file out of a volume")]
pub struct GetArgs {
    /// the path of the volume image file
    #[clap(short = 'p', long)]
    pub image_file_path: String,
    /// the file name inside the volume
    #[clap(short, long)]
    pub name: String,
    /// the host file to write to, stdout if absent
    #[clap(short, long)]
    pub output: Option<String>,
}

#[derive(clap::Args, Debug, PartialEq)]
pub struct FileArgs {
    /// the path of the volume image file
    #[clap(short = 'p', long)]
    pub image_file_path: String,
    /// the file name inside the volume
    #[clap(short, long)]
    pub name: String,
}

#[derive(clap::Args, Debug, PartialEq)]
#[command(about = "cut a file down to a given length")]
pub struct TruncateArgs {
    /// the path of the volume image file
    #[clap(short = 'p', long)]
    pub image_file_path: String,
    /// the file name inside the volume
    #[clap(short, long)]
    pub name: String,
    /// the new length in bytes
    #[clap(short, long)]
    pub length: usize,
}
