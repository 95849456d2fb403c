// This file is part of Nitrogen.
//
// Nitrogen is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// Nitrogen is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with Nitrogen.  If not, see <http://www.gnu.org/licenses/>.
use anyhow::Result;
use structopt::StructOpt;
use tracing_chrome::{ChromeLayerBuilder, EventOrSpan, FlushGuard};
use tracing_subscriber::{
    fmt::{format::DefaultFields, FormattedFields},
    prelude::*,
    registry::Registry,
    EnvFilter,
};

// Inspired heavily by bevy_log

const DEFAULT_FILTER: &str = "info";

#[derive(Clone, Debug, Default, StructOpt)]
pub struct TraceLogOpts {
    /// Capture a chrome-format execution trace.
    #[structopt(short = "T", long)]
    trace: bool,

    /// Log filter directives, used when RUST_LOG is not set.
    #[structopt(long)]
    log_filter: Option<String>,
}

impl TraceLogOpts {
    pub fn tracing(&self) -> bool {
        self.trace
    }

    fn filter(&self) -> Result<EnvFilter> {
        Ok(match EnvFilter::try_from_default_env() {
            Ok(filter) => filter,
            Err(_) => EnvFilter::try_new(self.log_filter.as_deref().unwrap_or(DEFAULT_FILTER))?,
        })
    }
}

/// Holds the chrome trace writer open; the trace is flushed when dropped.
#[derive(Default)]
pub struct TraceLog {
    chrome_guard: Option<FlushGuard>,
}

impl std::fmt::Debug for TraceLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TraceLog")
            .field("tracing", &self.chrome_guard.is_some())
            .finish()
    }
}

impl TraceLog {
    /// Install the global subscriber. `log` records are forwarded into
    /// tracing, so library code may use either.
    pub fn init(opts: &TraceLogOpts) -> Result<Self> {
        tracing_log::LogTracer::init()?;

        let subscriber = Registry::default()
            .with(opts.filter()?)
            .with(tracing_error::ErrorLayer::default())
            .with(tracing_subscriber::fmt::Layer::default());

        let (chrome_layer, chrome_guard) = if opts.trace {
            let (chrome_layer, guard) = ChromeLayerBuilder::new()
                .name_fn(Box::new(|event_or_span| match event_or_span {
                    EventOrSpan::Event(event) => event.metadata().name().into(),
                    EventOrSpan::Span(span) => {
                        if let Some(fields) =
                            span.extensions().get::<FormattedFields<DefaultFields>>()
                        {
                            format!("{}: {}", span.metadata().name(), fields.fields.as_str())
                        } else {
                            span.metadata().name().into()
                        }
                    }
                }))
                .build();
            (Some(chrome_layer), Some(guard))
        } else {
            (None, None)
        };

        tracing::subscriber::set_global_default(subscriber.with(chrome_layer))?;
        Ok(Self { chrome_guard })
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_parse_opts() {
        let opts = TraceLogOpts::from_iter(["test", "-T", "--log-filter", "atmosphere=debug"]);
        assert!(opts.tracing());
        assert_eq!(opts.log_filter.as_deref(), Some("atmosphere=debug"));
        assert!(!TraceLogOpts::from_iter(["test"]).tracing());
    }
}
