// Tilings used when a training config names none

use tilerl_agent::TilingSpec;

pub fn tilings_for(env: &str) -> Vec<TilingSpec> {
    match env {
        "mountain-car" => vec![
            // 8 tilings of 10x10 over [-1.2, 0.6] x [-0.07, 0.07]
            TilingSpec {
                dimension_mask: vec![true, true],
                widths: vec![0.18, 0.014],
                count: 8,
            },
            TilingSpec {
                dimension_mask: vec![true, false],
                widths: vec![0.18, 1.0],
                count: 2,
            },
            TilingSpec {
                dimension_mask: vec![false, true],
                widths: vec![1.0, 0.014],
                count: 2,
            },
        ],
        _ => vec![TilingSpec::uniform(1, 1.0, 4)],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tilerl_core::Env;
    use tilerl_env::make_env;

    #[test]
    fn test_presets_match_env_dimensions() {
        for name in tilerl_env::list_envs() {
            let env = make_env(&name, Some(0)).unwrap();
            let dims = env.curr_obs().dim();
            for spec in tilings_for(&name) {
                assert_eq!(spec.widths.len(), dims, "{name}");
                assert_eq!(spec.dimension_mask.len(), dims, "{name}");
            }
        }
    }
}
