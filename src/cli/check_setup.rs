// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use std::fmt;
use std::process::ExitCode;

use crate::config::ServerConfig;
use crate::vision::FileCheck;

/// Outcome of a setup verification
#[derive(Debug)]
pub struct SetupReport {
    pub checks: Vec<FileCheck>,
    /// Output directory status line
    pub output_dir: String,
}

impl SetupReport {
    pub fn all_required_present(&self) -> bool {
        self.checks
            .iter()
            .filter(|c| c.required)
            .all(FileCheck::exists)
    }
}

impl fmt::Display for SetupReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rule = "=".repeat(70);

        writeln!(f, "{}", rule)?;
        writeln!(f, "License Plate Recognition - Setup Verification")?;
        writeln!(f, "{}", rule)?;
        writeln!(f)?;

        writeln!(f, "Model Files:")?;
        for check in &self.checks {
            let status = if check.exists() { "✅" } else { "❌" };
            writeln!(
                f,
                "{} {}: {}",
                status,
                check.description,
                check.path.display()
            )?;
            match check.size_mb() {
                Some(mb) => writeln!(f, "   Size: {:.2} MB", mb)?,
                None if check.required => writeln!(
                    f,
                    "   ⚠️  ACTION REQUIRED: export the model to ONNX and place it here"
                )?,
                None => writeln!(f, "   (optional, text overlay disabled without it)")?,
            }
        }
        writeln!(f)?;

        writeln!(f, "Output Directory:")?;
        writeln!(f, "{}", self.output_dir)?;
        writeln!(f)?;

        writeln!(f, "{}", rule)?;
        if self.all_required_present() {
            writeln!(f, "✅ All required files are present. Ready to serve!")?;
        } else {
            writeln!(f, "❌ Some required files are missing. See above.")?;
        }
        writeln!(f, "{}", rule)
    }
}

/// Check model files and make sure the output directory exists
pub fn verify(config: &ServerConfig) -> SetupReport {
    let checks = config.models.verify_files();

    let output_dir = if config.output_dir.is_dir() {
        format!("✅ Exists: {}", config.output_dir.display())
    } else {
        match std::fs::create_dir_all(&config.output_dir) {
            Ok(()) => format!("✅ Created: {}", config.output_dir.display()),
            Err(e) => format!(
                "❌ Could not create {}: {}",
                config.output_dir.display(),
                e
            ),
        }
    };

    SetupReport { checks, output_dir }
}

/// Print the setup report; exit code 1 when a required file is missing
pub fn run(config: &ServerConfig) -> ExitCode {
    let report = verify(config);
    print!("{}", report);

    if report.all_required_present() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
