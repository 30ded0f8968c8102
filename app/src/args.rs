//! Command line arguments.

use std::path::PathBuf;

use clap::Parser;

/// Shroud asset protection arguments.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "shroud",
    about = "Protect a character asset with a keyed mesh distortion",
    long_about = "Encodes every mesh of a scene manifest with a freshly generated key and \
        patches the shaders of its materials so only a client holding the key renders \
        the true shape.\n\n\
        EXAMPLES:\n\
          # Protect with the settings from ./shroud.toml\n\
          shroud Avatars/Kitsune.scene.json\n\
        \n\
          # Accept a shorter key when the parameter budget is tight\n\
          shroud Avatars/Kitsune.scene.json --accept-short-key",
    version
)]
pub struct CliArgs {
    /// Asset path of the scene manifest to protect.
    pub scene: String,

    /// Configuration file.
    #[arg(long, short, default_value = "shroud.toml")]
    pub config: PathBuf,

    /// Continue with a shorter key when the parameter budget cannot fit the
    /// configured one. Short keys are easier to guess.
    #[arg(long)]
    pub accept_short_key: bool,

    /// Write the audit document here instead of the configured path.
    #[arg(long)]
    pub audit_log: Option<PathBuf>,

    /// Print the generated key bits after the run.
    #[arg(long)]
    pub show_key: bool,
}
