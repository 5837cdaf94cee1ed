use std::time::Duration;

use crate::immut_data::dynamic::BotCfg;

pub(crate) trait CfgExt {
    fn discord_token(&self) -> &str;
    fn discord_prefix(&self) -> &str;
    fn xp_cooldown(&self) -> Duration;
    fn voice_interval(&self) -> Duration;
    fn cfg(&self) -> BotCfg;
}

macro_rules! impl_cfg_ext {
    ($t:ty) => {
        impl crate::bots::CfgExt for $t {
            fn discord_token(&self) -> &str {
                &self.cfg.discord_token
            }

            fn discord_prefix(&self) -> &str {
                &self.cfg.discord_prefix
            }

            fn xp_cooldown(&self) -> ::std::time::Duration {
                self.cfg.xp_cooldown
            }

            fn voice_interval(&self) -> ::std::time::Duration {
                self.cfg.voice_interval
            }

            fn cfg(&self) -> BotCfg {
                self.cfg.clone()
            }
        }
    };
}

pub(super) use impl_cfg_ext;
