#![allow(dead_code)]

use xloader::{LoadDefinition, LoadResult, PluginFactory};

pub fn value_definition(name: &str) -> LoadDefinition {
    let value = name.to_string();
    LoadDefinition::from_fn(name, move || {
        let value = value.clone();
        async move { LoadResult::Ok(PluginFactory::value(value)) }
    })
}

pub fn yielding_definition(name: &str) -> LoadDefinition {
    LoadDefinition::from_fn(name, || async {
        tokio::task::yield_now().await;
        LoadResult::Ok(PluginFactory::value(()))
    })
}

pub fn build_batch(count: usize) -> Vec<LoadDefinition> {
    (0..count)
        .map(|i| yielding_definition(&format!("plugin-{}", i)))
        .collect()
}

pub fn build_chain(count: usize) -> Vec<LoadDefinition> {
    (0..count)
        .map(|i| {
            let def = value_definition(&format!("p{}", i));
            if i == 0 {
                def
            } else {
                def.depends_on([format!("p{}", i - 1)])
            }
        })
        .rev()
        .collect()
}
