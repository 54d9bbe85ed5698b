pub mod handlers;

use crate::presentation::cli::{Cli, Commands, ManifestCommands};
use handlers::Outcome;

pub fn run(cli: Cli) -> Outcome {
    match cli.command {
        Commands::Validate { unit } => handlers::handle_validate(unit),
        Commands::Batch {
            root,
            report,
            threads,
        } => handlers::handle_batch(root, report, threads),
        Commands::Reconstruct {
            root,
            out,
            expect_hash,
            algorithm,
            no_verify,
        } => handlers::handle_reconstruct(root, out, expect_hash, algorithm, !no_verify),
        Commands::Manifest(cmd) => match cmd {
            ManifestCommands::Generate {
                dir,
                out,
                algorithm,
            } => handlers::handle_manifest_generate(dir, out, algorithm),
            ManifestCommands::Check {
                manifest,
                dir,
                report,
            } => handlers::handle_manifest_check(manifest, dir, report),
        },
        Commands::Digest { file, algorithms } => handlers::handle_digest(file, algorithms),
        Commands::Pipeline {
            kind,
            size,
            chunk_size,
            method,
            level,
            algorithm,
            cbor,
            producer_cmd,
            threads,
            keep,
            report,
        } => handlers::handle_pipeline(
            kind,
            size,
            chunk_size,
            method,
            level,
            algorithm,
            cbor,
            producer_cmd,
            threads,
            keep,
            report,
        ),
    }
}
