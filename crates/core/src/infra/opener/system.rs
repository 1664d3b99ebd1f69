use std::process::{Command, Stdio};

use super::{OpenError, UrlOpener};

/// OS標準のオープナーでURLを開く
pub struct SystemOpener {
    program: String,
    args: Vec<String>,
}

impl SystemOpener {
    pub fn new() -> Self {
        let (program, args) = platform_command(std::env::consts::OS);
        Self::with_command(program, args)
    }

    /// 任意のコマンドを使う（URLは最後の引数として渡される）
    pub fn with_command(program: &str, args: Vec<&str>) -> Self {
        Self {
            program: program.to_string(),
            args: args.into_iter().map(str::to_string).collect(),
        }
    }
}

/// OSごとの起動コマンド。
///
/// Windows は cmd.exe を経由しない（URL中の `&` 等がシェルに解釈されるため）。
fn platform_command(os: &str) -> (&'static str, Vec<&'static str>) {
    match os {
        "macos" => ("open", vec![]),
        "windows" => ("rundll32", vec!["url.dll,FileProtocolHandler"]),
        _ => ("xdg-open", vec![]),
    }
}

impl Default for SystemOpener {
    fn default() -> Self {
        Self::new()
    }
}

impl UrlOpener for SystemOpener {
    fn open(&self, url: &str) -> Result<(), OpenError> {
        let lower = url.to_ascii_lowercase();
        if !(lower.starts_with("https://") || lower.starts_with("http://")) {
            return Err(OpenError::Failed(format!("refusing non-http URL: {url}")));
        }
        // 子プロセスは待たない（ブラウザ側の処理に任せる）
        Command::new(&self.program)
            .args(&self.args)
            .arg(url)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => OpenError::NotAvailable(self.program.clone()),
                _ => OpenError::Failed(format!("{}: {e}", self.program)),
            })?;
        log::debug!("{} {url}", self.program);
        Ok(())
    }

    fn name(&self) -> &str {
        "system"
    }
}
