//! Command line entry point wiring config, stores and the protector together.

use shroud_vfs::FileSystemProvider;

use crate::args::CliArgs;
use crate::audit::install_logger;
use crate::config::{build_vfs, load_or_default, ShroudConfig};
use crate::context::ProtectContext;
use crate::keys::LocalKeyStore;
use crate::protect::{FixedOperator, ProtectError, Protector};
use crate::report::ProtectReport;
use crate::scene::SceneManifest;

/// The `shroud` command.
pub struct App;

impl App {
    /// Run one protection from parsed arguments.
    ///
    /// Installs the logger, always flushes the audit document, and returns
    /// whether the run succeeded.
    pub fn run(args: CliArgs) -> bool {
        install_logger();
        crate::init();

        let mut config = match load_or_default(&args.config) {
            Ok(config) => config,
            Err(e) => {
                log::error!("Cannot use {}: {e}", args.config.display());
                return false;
            }
        };
        if let Some(path) = &args.audit_log {
            config.protect.audit_log = path.clone();
        }

        let mut ctx = ProtectContext::new();
        let result = Self::protect(&args, &config, &mut ctx);
        ctx.audit().flush(&config.protect.audit_log);

        match result {
            Ok(report) => {
                log::info!("{}", report.summary());
                if let Some(scene) = &report.scene {
                    println!("{scene}");
                }
                if args.show_key {
                    for (name, bit) in report.bit_names.iter().zip(&report.bits) {
                        println!("{name} = {}", u8::from(*bit));
                    }
                }
                report.failures() == 0
            }
            Err(e) => {
                log::error!("Protection failed: {e}");
                false
            }
        }
    }

    fn protect(
        args: &CliArgs,
        config: &ShroudConfig,
        ctx: &mut ProtectContext,
    ) -> Result<ProtectReport, ProtectError> {
        let vfs = build_vfs(config);
        let manifest = SceneManifest::load(&vfs, &args.scene)?;

        let params_store = config
            .protect
            .saved_params_root
            .as_ref()
            .map(FileSystemProvider::new);

        let mut protector = Protector::new(&vfs, config).with_operator(FixedOperator {
            accept_short_key: args.accept_short_key,
        });
        if let Some(store) = &params_store {
            match LocalKeyStore::discover(store) {
                Ok(profiles) => {
                    for profile in profiles {
                        protector = protector.with_key_store(profile);
                    }
                }
                Err(e) => ctx
                    .audit_mut()
                    .warn(format!("Saved parameters unavailable: {e}")),
            }
        }

        protector.protect(&manifest, &mut rand::thread_rng(), ctx)
    }
}
