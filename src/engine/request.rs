// src/engine/request.rs

//! Caller options for one install and the installer-script command line
//! derived from them.

/// Share of device resources donated when the caller does not say.
pub const DEFAULT_PERCENT: u8 = 50;

/// Options supplied with an install request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstallRequest {
    /// Percentage of resources to donate; `None` means [`DEFAULT_PERCENT`].
    pub percent: Option<u8>,
    /// Network interfaces the node may use, in preference order. `None`
    /// and an empty list both mean "no restriction".
    pub interfaces: Option<Vec<String>>,
    /// Free-form string appended verbatim as a single argument.
    pub extra_arguments: Option<String>,
}

impl InstallRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_percent(mut self, percent: u8) -> Self {
        self.percent = Some(percent);
        self
    }

    pub fn with_interfaces<I, S>(mut self, interfaces: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.interfaces = Some(interfaces.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_extra_arguments(mut self, extra: impl Into<String>) -> Self {
        self.extra_arguments = Some(extra.into());
        self
    }

    pub fn effective_percent(&self) -> u8 {
        self.percent.unwrap_or(DEFAULT_PERCENT)
    }

    /// Arguments for the installer script, in the order it expects them:
    ///
    /// 1. `--percent <N>`
    /// 2. `--disable-startup-script True`
    /// 3. `--nm-iface <name> --repy-iface <name>` per interface
    /// 4. `--repy-nootherips` once, if any interface was given
    /// 5. the extra argument string, if any
    pub fn launch_arguments(&self) -> Vec<String> {
        let mut args = vec![
            "--percent".to_string(),
            self.effective_percent().to_string(),
            "--disable-startup-script".to_string(),
            "True".to_string(),
        ];

        let interfaces = self.interfaces.as_deref().unwrap_or_default();
        for iface in interfaces {
            args.push("--nm-iface".to_string());
            args.push(iface.clone());
            args.push("--repy-iface".to_string());
            args.push(iface.clone());
        }
        if !interfaces.is_empty() {
            args.push("--repy-nootherips".to_string());
        }

        if let Some(extra) = &self.extra_arguments {
            args.push(extra.clone());
        }

        args
    }
}
