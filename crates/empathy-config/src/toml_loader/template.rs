//! Default TOML config template with inline documentation comments.

/// Generate the default TOML config content with comments.
pub(crate) fn default_config_toml() -> String {
    r##"# EmpathyBot Configuration
# Schema version 1
# Only override what you want to change -- missing fields use defaults.

[model]
# repo = "microsoft/DialoGPT-medium"
# revision = "main"
# path = "/models/dialogpt"   # local directory, skips the hub
# cache_dir = "/var/cache/hf" # hub download cache
# device = "cpu"              # cpu, auto

[generation]
# max_length = 1000           # 16-4096, total tokens including context
# temperature = 0.7           # unset = greedy decoding
# top_p = 0.9                 # 0.0-1.0, needs temperature
# repeat_penalty = 1.0        # 1.0-2.0
# repeat_last_n = 64
# seed = 299792458
# timeout_secs = 0            # 0-3600, 0 = wait forever

[session]
# greeting = "Hi there. I'm listening. How are you feeling today?"
# overflow = "passthrough"    # passthrough, reject, sliding_window
# reserve_tokens = 200        # reply room for sliding_window

[logging]
# level = "INFO"              # DEBUG, INFO, WARNING, ERROR
"##
    .to_string()
}
