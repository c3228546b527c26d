mod cmd;
mod output;

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use cmd::{
  Globals, ListOptions, Relation, cmd_cache_key, cmd_cat, cmd_family, cmd_from, cmd_info, cmd_list, cmd_shared_tags,
};
use output::print_error;

/// kiln - build order and cache keys for official-images manifests
#[derive(Parser)]
#[command(name = "kiln")]
#[command(author, version, about, long_about = None)]
struct Cli {
  #[command(flatten)]
  globals: Globals,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// List repo:tag combinations for the given repos
  #[command(alias = "ls")]
  List {
    /// Repos to list (`repo`, `repo:tag`, a file path or a URL)
    repos: Vec<String>,

    /// List every repo in the library
    #[arg(long)]
    all: bool,

    /// Only the first tag of each entry
    #[arg(long)]
    uniq: bool,

    /// Sort by the order repos and entries have to be built in
    #[arg(long)]
    build_order: bool,

    /// Leave out entries that cannot be built on this host
    #[arg(long)]
    apply_constraints: bool,

    /// Only repo names, not tags
    #[arg(long = "repos")]
    repos_only: bool,
  },

  /// Print the images each tag is built from
  From {
    repos: Vec<String>,

    #[arg(long)]
    all: bool,

    #[arg(long)]
    uniq: bool,

    #[arg(long)]
    apply_constraints: bool,
  },

  /// Print the tags built (directly or not) on the given tags
  #[command(aliases = ["offspring", "descendants"])]
  Children {
    repos: Vec<String>,

    #[arg(long)]
    all: bool,

    /// Walk from the first tag of each entry only
    #[arg(long)]
    uniq: bool,

    /// How many levels to walk
    #[arg(long)]
    depth: Option<usize>,

    #[arg(long)]
    apply_constraints: bool,
  },

  /// Print the tags the given tags are built on
  #[command(aliases = ["ancestors", "progenitors"])]
  Parents {
    repos: Vec<String>,

    #[arg(long)]
    all: bool,

    /// Walk from the first tag of each entry only
    #[arg(long)]
    uniq: bool,

    /// How many levels to walk
    #[arg(long)]
    depth: Option<usize>,

    #[arg(long)]
    apply_constraints: bool,
  },

  /// Print the normalized manifest
  Cat {
    repos: Vec<String>,

    #[arg(long)]
    all: bool,
  },

  /// Print shared tags and the entries backing them
  SharedTags {
    repos: Vec<String>,

    #[arg(long)]
    all: bool,
  },

  /// Print the cache tag a build of each entry would be stored under
  CacheKey {
    repos: Vec<String>,

    #[arg(long)]
    all: bool,

    #[arg(long)]
    uniq: bool,
  },

  /// Show the effective configuration
  Info,
}

fn run(cli: Cli) -> anyhow::Result<()> {
  let globals = &cli.globals;
  match cli.command {
    Commands::List {
      repos,
      all,
      uniq,
      build_order,
      apply_constraints,
      repos_only,
    } => cmd_list(
      globals,
      &repos,
      ListOptions {
        all,
        uniq,
        build_order,
        apply_constraints,
        repos_only,
      },
    ),
    Commands::From {
      repos,
      all,
      uniq,
      apply_constraints,
    } => cmd_from(globals, &repos, all, uniq, apply_constraints),
    Commands::Children {
      repos,
      all,
      uniq,
      depth,
      apply_constraints,
    } => cmd_family(globals, Relation::Children, &repos, all, uniq, depth, apply_constraints),
    Commands::Parents {
      repos,
      all,
      uniq,
      depth,
      apply_constraints,
    } => cmd_family(globals, Relation::Parents, &repos, all, uniq, depth, apply_constraints),
    Commands::Cat { repos, all } => cmd_cat(globals, &repos, all),
    Commands::SharedTags { repos, all } => cmd_shared_tags(globals, &repos, all),
    Commands::CacheKey { repos, all, uniq } => cmd_cache_key(globals, &repos, all, uniq),
    Commands::Info => cmd_info(globals),
  }
}

fn main() -> ExitCode {
  let cli = Cli::parse();

  let default_level = if cli.globals.debug { "debug" } else { "warn" };
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(std::io::stderr)
    .without_time()
    .init();

  match run(cli) {
    Ok(()) => ExitCode::SUCCESS,
    Err(err) => {
      print_error(&format!("{:#}", err));
      ExitCode::FAILURE
    }
  }
}
