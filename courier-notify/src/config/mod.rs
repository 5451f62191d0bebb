mod settings;

pub use settings::NotifyServiceConfig;
