mod consts;
mod logging;
mod server;
mod server_utils;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use swdocs::{
    SiteOptions, SourceOptions,
    errors::{OptionsError, SwdocsError},
    params::RouteParams,
    route::SLUG_PARAM,
};
use tracing::error;

use consts::{DEFAULT_CONFIG_FILE, PORT};
use logging::init_logging;
use server::{AppState, render_page, start_server};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Do not print any logs
    #[arg(long, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the documents over HTTP
    Serve {
        /// Expose the server to the network
        #[arg(long)]
        host: bool,

        /// Port to listen on, the next free one is used if it is taken
        #[arg(long, default_value_t = PORT)]
        port: u16,

        #[command(flatten)]
        site: SiteArgs,
    },
    /// Render the page of a document to stdout
    Render {
        slug: String,

        #[command(flatten)]
        site: SiteArgs,
    },
}

#[derive(Args, Debug, Default)]
struct SiteArgs {
    /// Options file, defaults to `swdocs.toml` when it exists
    #[arg(long)]
    config: Option<PathBuf>,

    /// Read documents from this directory instead of the configured source
    #[arg(long)]
    content_dir: Option<PathBuf>,
}

impl SiteArgs {
    fn resolve(&self) -> Result<SiteOptions, OptionsError> {
        self.resolve_in(Path::new("."))
    }

    fn resolve_in(&self, cwd: &Path) -> Result<SiteOptions, OptionsError> {
        let mut options = match &self.config {
            Some(path) => SiteOptions::load(path)?,
            None => {
                let default_path = cwd.join(DEFAULT_CONFIG_FILE);
                if default_path.exists() {
                    SiteOptions::load(&default_path)?
                } else {
                    SiteOptions::default()
                }
            }
        };

        if let Some(content_dir) = &self.content_dir {
            options.source = SourceOptions::Fs {
                root: content_dir.clone(),
            };
        }

        Ok(options)
    }
}

async fn render(slug: String, site: &SiteArgs) -> Result<ExitCode, SwdocsError> {
    let state = AppState::new(site.resolve()?)?;
    let params: RouteParams = [(SLUG_PARAM, slug)].into_iter().collect();

    let (status, markup) = render_page(&state, &params).await;
    println!("{}", markup.into_string());

    Ok(if status < 400 {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if !cli.quiet {
        init_logging();
    }

    let result = match &cli.command {
        Commands::Serve { host, port, site } => match site.resolve() {
            Ok(options) => start_server(options, *host, *port)
                .await
                .map(|_| ExitCode::SUCCESS),
            Err(err) => Err(err.into()),
        },
        Commands::Render { slug, site } => render(slug.clone(), site).await,
    };

    match result {
        Ok(code) => code,
        Err(err) => {
            error!(name: "swdocs", "{}", err);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn serve_defaults_to_the_standard_port() {
        let cli = Cli::try_parse_from(["swdocs", "serve"]).unwrap();
        match cli.command {
            Commands::Serve { host, port, .. } => {
                assert!(!host);
                assert_eq!(port, PORT);
            }
            Commands::Render { .. } => panic!("expected serve"),
        }
    }

    #[test]
    fn options_fall_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let options = SiteArgs::default().resolve_in(dir.path()).unwrap();
        assert_eq!(options, SiteOptions::default());
    }

    #[test]
    fn default_config_file_is_picked_up_and_content_dir_overrides_source() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(DEFAULT_CONFIG_FILE),
            "site_title = \"Handbook\"\n\n[source]\nkind = \"github\"\nowner = \"acme\"\nrepo = \"docs\"\n",
        )
        .unwrap();

        let options = SiteArgs::default().resolve_in(dir.path()).unwrap();
        assert_eq!(options.site_title, "Handbook");
        assert!(matches!(options.source, SourceOptions::Github { .. }));

        let args = SiteArgs {
            config: None,
            content_dir: Some("docs".into()),
        };
        let options = args.resolve_in(dir.path()).unwrap();
        assert_eq!(options.site_title, "Handbook");
        assert_eq!(
            options.source,
            SourceOptions::Fs {
                root: "docs".into()
            }
        );
    }

    #[test]
    fn explicit_config_must_exist() {
        let dir = tempfile::tempdir().unwrap();
        let args = SiteArgs {
            config: Some(dir.path().join("missing.toml")),
            content_dir: None,
        };
        assert!(matches!(
            args.resolve_in(dir.path()),
            Err(OptionsError::ReadFailed { .. })
        ));
    }
}
