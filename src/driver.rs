//! Top-level decision logic: load, deobfuscate, decide whether to write, report.
//!
//! [`run`] is what a command-line front end calls with its arguments. It never prints and never
//! waits for input; everything the user should see comes back as ordered [`StatusMessage`]s in the
//! [`RunReport`], together with a [`RunStatus`] and a process exit code. The messages are also
//! emitted through `log` at their level.
//!
//! Output is written next to the input as `<stem>-decrypted.<ext>` whenever at least one string
//! was decrypted, even if cleanup failed afterwards, using the module's own writer options with
//! [`MetadataFlags::KEEP_OLD_MAX_STACK`] forced on. Nothing is written otherwise.
//!
//! # Examples
//!
//! ```rust
//! use dotzion::deobfuscation::EngineConfig;
//! use dotzion::driver::{run, RunStatus};
//! use dotzion::file::memory::MemoryIo;
//! use dotzion::metadata::module::Module;
//!
//! let io = MemoryIo::new().with_module("clean.exe", Module::new("clean.exe"));
//! let report = run(["clean.exe"], &io, &EngineConfig::default());
//!
//! assert!(matches!(report.status, RunStatus::NothingFound));
//! assert_eq!(report.exit_code(), 1);
//! assert_eq!(report.messages.last().unwrap().text, "Encrypted strings not found!");
//! ```

use std::{
    ffi::{OsStr, OsString},
    path::{Path, PathBuf},
};

use log::{debug, log, Level};

use crate::{
    deobfuscation::{DecryptionCache, DeobfuscationEngine, DeobfuscationResult, EngineConfig},
    file::{AssemblyIo, MetadataFlags},
    metadata::module::Module,
    Error, Result,
};

/// What the tool was asked to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Assembly to deobfuscate
    pub input: PathBuf,
}

impl Invocation {
    /// Parses the positional arguments, program name excluded.
    ///
    /// The first argument is the input path; any further ones are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInvocation`] if no (non-empty) path was given.
    pub fn from_args<I, S>(args: I) -> Result<Invocation>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        match args.into_iter().next() {
            Some(arg) if !arg.as_ref().is_empty() => Ok(Invocation {
                input: PathBuf::from(arg.as_ref()),
            }),
            _ => Err(Error::InvalidInvocation("unknown path".to_string())),
        }
    }
}

/// Returns the path the rewritten module is written to: `<stem><suffix>.<ext>` in the input's
/// directory, or `<stem><suffix>` when the input has no extension.
///
/// # Examples
///
/// ```rust
/// use std::path::{Path, PathBuf};
/// use dotzion::driver::output_path;
///
/// assert_eq!(
///     output_path(Path::new("bin/app.exe"), "-decrypted"),
///     PathBuf::from("bin/app-decrypted.exe")
/// );
/// ```
#[must_use]
pub fn output_path(input: &Path, suffix: &str) -> PathBuf {
    let mut name = input
        .file_stem()
        .map_or_else(|| OsString::from("output"), OsStr::to_os_string);
    name.push(suffix);
    if let Some(ext) = input.extension() {
        name.push(".");
        name.push(ext);
    }

    let parent = input.parent().unwrap_or(Path::new(""));
    parent.join(name)
}

/// How a run ended.
#[derive(Debug)]
pub enum RunStatus {
    /// Strings were decrypted and the output was written.
    Saved {
        /// Where the output went
        output: PathBuf,
        /// Number of decrypted strings
        strings: usize,
    },
    /// No string was decrypted; nothing was written.
    NothingFound,
    /// No input path was given.
    InvalidInvocation,
    /// The input could not be loaded.
    LoadFailed(Error),
    /// Strings were decrypted but the output could not be written.
    WriteFailed {
        /// Where the output should have gone
        output: PathBuf,
        /// Why writing failed
        error: Error,
    },
}

/// One line of user-facing status output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusMessage {
    /// Severity, also used as the log level
    pub level: Level,
    /// The message
    pub text: String,
}

/// Everything a run produced.
#[derive(Debug)]
pub struct RunReport {
    /// How the run ended
    pub status: RunStatus,
    /// User-facing status lines, in order
    pub messages: Vec<StatusMessage>,
    /// Engine outcome, if the input was loaded
    pub result: Option<DeobfuscationResult>,
    /// The module as it stands after deobfuscation, if the input was loaded
    pub module: Option<Module>,
}

impl RunReport {
    fn new() -> Self {
        RunReport {
            status: RunStatus::NothingFound,
            messages: Vec::new(),
            result: None,
            module: None,
        }
    }

    fn push(&mut self, level: Level, text: impl Into<String>) {
        let text = text.into();
        log!(level, "{text}");
        self.messages.push(StatusMessage { level, text });
    }

    /// Returns the process exit code for this run.
    ///
    /// | Status | Code |
    /// |--------|------|
    /// | `Saved` | 0 |
    /// | `NothingFound` | 1 |
    /// | `InvalidInvocation` | 2 |
    /// | `LoadFailed`, `WriteFailed` | 3 |
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self.status {
            RunStatus::Saved { .. } => 0,
            RunStatus::NothingFound => 1,
            RunStatus::InvalidInvocation => 2,
            RunStatus::LoadFailed(_) | RunStatus::WriteFailed { .. } => 3,
        }
    }

    /// Returns true if output was written.
    #[must_use]
    pub fn is_saved(&self) -> bool {
        matches!(self.status, RunStatus::Saved { .. })
    }
}

/// Runs the tool on `args` (program name excluded).
///
/// A fresh [`DecryptionCache`] is created for the run and dropped with it.
pub fn run<I, S>(args: I, io: &impl AssemblyIo, config: &EngineConfig) -> RunReport
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let mut report = RunReport::new();

    let invocation = match Invocation::from_args(args) {
        Ok(invocation) => invocation,
        Err(error) => {
            debug!("{error}");
            report.push(Level::Error, "Unknown path.");
            report.status = RunStatus::InvalidInvocation;
            return report;
        }
    };

    let mut module = match io.load(&invocation.input) {
        Ok(module) => module,
        Err(error) => {
            report.push(Level::Error, format!("Error: {error}"));
            report.status = RunStatus::LoadFailed(error);
            return report;
        }
    };

    let cache = DecryptionCache::new();
    let result = DeobfuscationEngine::new(config.clone()).process(&mut module, &cache);
    debug!(
        "{}; cache: {} entries, {} hits, {} misses",
        result.summary(),
        cache.len(),
        cache.hits(),
        cache.misses()
    );

    conclude(&invocation.input, module, result, io, config)
}

/// Reports the engine outcome for `input` and writes `module` if any string was decrypted.
///
/// A top-level failure in `result` is reported but does not prevent the write; whatever was
/// decrypted before it is saved.
pub fn conclude(
    input: &Path,
    module: Module,
    result: DeobfuscationResult,
    io: &impl AssemblyIo,
    config: &EngineConfig,
) -> RunReport {
    let mut report = RunReport::new();

    for failure in &result.method_failures {
        report.push(
            Level::Warn,
            format!("Error: {}: {}", failure.name, failure.error),
        );
    }
    match &result.failure {
        Some(failure) => report.push(Level::Error, format!("Error: {failure}")),
        None if result.helper_found => report.push(
            Level::Info,
            format!("Successfully decrypted {} strings!", result.strings_decrypted),
        ),
        None => {}
    }

    if result.has_decrypted() {
        let output = output_path(input, &config.output_suffix);
        let options = module
            .writer_options
            .with_flags(MetadataFlags::KEEP_OLD_MAX_STACK);

        match io.write(&module, &output, &options) {
            Ok(()) => {
                report.push(Level::Info, format!("Saved at {}!", output.display()));
                report.status = RunStatus::Saved {
                    output,
                    strings: result.strings_decrypted,
                };
            }
            Err(error) => {
                report.push(Level::Error, format!("Error: {error}"));
                report.status = RunStatus::WriteFailed { output, error };
            }
        }
    } else {
        report.push(Level::Warn, "Encrypted strings not found!");
        report.status = RunStatus::NothingFound;
    }

    report.result = Some(result);
    report.module = Some(module);
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        file::{memory::MemoryIo, WriterOptions},
        test::{protected_module, string_operands, ModuleBuilder},
    };

    fn texts(report: &RunReport) -> Vec<&str> {
        report.messages.iter().map(|m| m.text.as_str()).collect()
    }

    #[test]
    fn test_invocation_requires_path() {
        assert!(matches!(
            Invocation::from_args(Vec::<String>::new()),
            Err(Error::InvalidInvocation(_))
        ));
        assert!(matches!(
            Invocation::from_args([""]),
            Err(Error::InvalidInvocation(_))
        ));

        let invocation = Invocation::from_args(["a.exe", "ignored"]).unwrap();
        assert_eq!(invocation.input, PathBuf::from("a.exe"));
    }

    #[test]
    fn test_output_path() {
        assert_eq!(
            output_path(Path::new("app.exe"), "-decrypted"),
            PathBuf::from("app-decrypted.exe")
        );
        assert_eq!(
            output_path(Path::new("/data/samples/lib.dll"), "-decrypted"),
            PathBuf::from("/data/samples/lib-decrypted.dll")
        );
        assert_eq!(
            output_path(Path::new("dir/noext"), "-x"),
            PathBuf::from("dir/noext-x")
        );
        assert_eq!(
            output_path(Path::new("a.b.exe"), "-decrypted"),
            PathBuf::from("a.b-decrypted.exe")
        );
    }

    #[test]
    fn test_missing_argument() {
        let io = MemoryIo::new();
        let report = run(Vec::<String>::new(), &io, &EngineConfig::default());

        assert!(matches!(report.status, RunStatus::InvalidInvocation));
        assert_eq!(texts(&report), vec!["Unknown path."]);
        assert_eq!(report.exit_code(), 2);
        assert!(report.result.is_none());
    }

    #[test]
    fn test_load_failure() {
        let io = MemoryIo::new();
        let report = run(["missing.exe"], &io, &EngineConfig::default());

        assert!(matches!(report.status, RunStatus::LoadFailed(_)));
        assert_eq!(report.exit_code(), 3);
        assert!(report.messages[0].text.starts_with("Error: "));
        assert!(report.module.is_none());
    }

    #[test]
    fn test_saved() {
        let mut module = protected_module();
        module.writer_options = WriterOptions::new(MetadataFlags::PRESERVE_TOKENS);
        let io = MemoryIo::new().with_module("app.exe", module);

        let report = run(["app.exe"], &io, &EngineConfig::default());

        assert!(report.is_saved());
        assert_eq!(report.exit_code(), 0);
        assert_eq!(
            texts(&report),
            vec!["Successfully decrypted 3 strings!", "Saved at app-decrypted.exe!"]
        );
        match &report.status {
            RunStatus::Saved { output, strings } => {
                assert_eq!(output, &PathBuf::from("app-decrypted.exe"));
                assert_eq!(*strings, 3);
            }
            other => panic!("unexpected: {other:?}"),
        }

        let writes = io.writes().unwrap();
        let (path, options) = &writes[0];
        assert_eq!(path, &PathBuf::from("app-decrypted.exe"));
        assert!(options
            .metadata_flags
            .contains(MetadataFlags::PRESERVE_TOKENS | MetadataFlags::KEEP_OLD_MAX_STACK));

        let written = io.get(Path::new("app-decrypted.exe")).unwrap().unwrap();
        let main = written.find_type("App.Program").unwrap().methods[0]
            .body
            .as_ref()
            .unwrap();
        assert_eq!(string_operands(main), vec!["Hello world", "done"]);

        // input untouched
        assert_eq!(io.get(Path::new("app.exe")).unwrap().unwrap().types.len(), 3);
    }

    #[test]
    fn test_nothing_found_for_clean_module() {
        let io = MemoryIo::new().with_module(
            "clean.exe",
            ModuleBuilder::new("clean.exe").with_program(&["AB"]).build(),
        );

        let report = run(["clean.exe"], &io, &EngineConfig::default());

        assert!(matches!(report.status, RunStatus::NothingFound));
        assert_eq!(texts(&report), vec!["Encrypted strings not found!"]);
        assert!(io.writes().unwrap().is_empty());
    }

    #[test]
    fn test_nothing_found_for_unreferenced_helper() {
        let module = ModuleBuilder::new("idle.exe")
            .with_helper()
            .with_program(&["AB"])
            .build();
        let io = MemoryIo::new().with_module("idle.exe", module.clone());

        let report = run(["idle.exe"], &io, &EngineConfig::default());

        assert_eq!(report.exit_code(), 1);
        assert_eq!(
            texts(&report),
            vec!["Successfully decrypted 0 strings!", "Encrypted strings not found!"]
        );
        assert!(io.writes().unwrap().is_empty());
        assert_eq!(report.module.as_ref(), Some(&module));
    }

    #[test]
    fn test_write_failure_keeps_results() {
        let io = MemoryIo::new()
            .with_module("app.exe", protected_module())
            .failing_writes();

        let report = run(["app.exe"], &io, &EngineConfig::default());

        assert_eq!(report.exit_code(), 3);
        assert!(matches!(
            report.status,
            RunStatus::WriteFailed {
                error: Error::Serialization(_),
                ..
            }
        ));
        assert_eq!(report.result.as_ref().unwrap().strings_decrypted, 3);
        assert_eq!(report.module.as_ref().unwrap().types.len(), 1);
        assert_eq!(report.messages.last().unwrap().level, Level::Error);
    }

    #[test]
    fn test_top_level_failure_still_saves() {
        let io = MemoryIo::new();
        let result = DeobfuscationResult {
            helper_found: true,
            methods_processed: 1,
            literals_rewritten: 1,
            strings_decrypted: 1,
            failure: Some(Error::Error("cleanup interrupted".to_string())),
            ..DeobfuscationResult::default()
        };

        let report = conclude(
            Path::new("app.exe"),
            protected_module(),
            result,
            &io,
            &EngineConfig::default(),
        );

        assert_eq!(report.exit_code(), 0);
        assert_eq!(
            texts(&report),
            vec!["Error: cleanup interrupted", "Saved at app-decrypted.exe!"]
        );
        assert_eq!(report.messages[0].level, Level::Error);
        assert!(matches!(
            &report.status,
            RunStatus::Saved { strings: 1, .. }
        ));
        assert!(io.contains(Path::new("app-decrypted.exe")).unwrap());
        assert!(report.result.unwrap().failure.is_some());
    }

    #[test]
    fn test_top_level_failure_without_strings_writes_nothing() {
        let io = MemoryIo::new();
        let result = DeobfuscationResult {
            helper_found: true,
            failure: Some(Error::Error("cleanup interrupted".to_string())),
            ..DeobfuscationResult::default()
        };

        let report = conclude(
            Path::new("app.exe"),
            protected_module(),
            result,
            &io,
            &EngineConfig::default(),
        );

        assert_eq!(report.exit_code(), 1);
        assert_eq!(
            texts(&report),
            vec!["Error: cleanup interrupted", "Encrypted strings not found!"]
        );
        assert!(io.writes().unwrap().is_empty());
    }

    #[test]
    fn test_custom_suffix() {
        let io = MemoryIo::new().with_module("dir/app.exe", protected_module());
        let config = EngineConfig::new().with_output_suffix("-clean");

        let report = run(["dir/app.exe"], &io, &config);

        assert!(report.is_saved());
        assert!(io.contains(Path::new("dir/app-clean.exe")).unwrap());
    }
}
