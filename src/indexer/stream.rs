//! Rendering of the `srcsrv` stream embedded into a PDB.

use std::io::{self, Write};

use super::args::CommandArgumentSet;

#[cfg(windows)]
pub const LINE_ENDING: &str = "\r\n";
#[cfg(not(windows))]
pub const LINE_ENDING: &str = "\n";

/// Format of the `DATETIME` header value, e.g. `Mon, 05 March 2024 14:07`.
pub const DATETIME_FORMAT: &str = "%a, %d %B %Y %H:%M";

pub const INI_MARKER: &str = "SRCSRV: ini ------------------------------------------------";
pub const VARIABLES_MARKER: &str = "SRCSRV: variables ------------------------------------------";
pub const SOURCE_FILES_MARKER: &str = "SRCSRV: source files ---------------------------------------";
pub const END_MARKER: &str = "SRCSRV: end ------------------------------------------------";

/// Writes `srcsrv` streams for one indexer configuration.
pub struct StreamWriter<'a, W: Write> {
    out: W,
    allowed_args: &'a [String],
}

/// Values of the header section.
pub struct StreamHeader<'a> {
    pub indexer_name: &'a str,
    pub datetime: String,
    pub backup_location: &'a str,
    pub extract_command: &'a str,
}

impl<'a, W: Write> StreamWriter<'a, W> {
    pub fn new(out: W, allowed_args: &'a [String]) -> Self {
        Self { out, allowed_args }
    }

    fn line(&mut self, text: &str) -> io::Result<()> {
        self.out.write_all(text.as_bytes())?;
        self.out.write_all(LINE_ENDING.as_bytes())
    }

    /// Writes the ini and variables sections, ending with the marker that
    /// opens the source files section.
    pub fn write_header(&mut self, header: &StreamHeader<'_>) -> io::Result<()> {
        self.line(INI_MARKER)?;
        self.line("VERSION=1")?;
        self.line("INDEXVERSION=2")?;
        self.line(&format!("VERCTRL={}", header.indexer_name))?;
        self.line(&format!("DATETIME={}", header.datetime))?;
        self.line(VARIABLES_MARKER)?;

        let allowed = self.allowed_args;
        for (i, name) in allowed.iter().enumerate() {
            self.line(&format!("{}=%var{}%", name, i + 1))?;
        }

        self.line(r"SRCSRVTRG=%targ%\%CachePath%\%Revision%\%fnfile%(%FilePath%)")?;
        self.line(&format!(
            concat!(
                r#"SRCSRVCMD=cmd /c "IF %CopyLocal%==TRUE (ECHO F|xcopy "{}\%CachePath%\%Revision%\%fnfile%(%FilePath%)" %SRCSRVTRG% /Q /Y /Z) "#,
                r#"ELSE ({})""#
            ),
            header.backup_location, header.extract_command
        ))?;
        self.line(SOURCE_FILES_MARKER)
    }

    /// Writes one data line: each allowed argument's value joined by `*`.
    pub fn write_source(&mut self, args: &CommandArgumentSet) -> io::Result<()> {
        let allowed = self.allowed_args;
        let mut values = Vec::with_capacity(allowed.len());
        for name in allowed {
            values.push(args.get(name).map_err(io::Error::other)?);
        }
        self.line(&values.join("*"))
    }

    pub fn write_footer(&mut self) -> io::Result<()> {
        self.line(END_MARKER)?;
        self.out.flush()
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

/// Current local time in the header format.
pub fn header_timestamp() -> String {
    chrono::Local::now().format(DATETIME_FORMAT).to_string()
}
