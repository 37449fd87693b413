//! Identifier hashing and built-in name translation.

use std::collections::BTreeMap;

use super::OutputType;

/// One-way hash applied to user identifiers when name hashing is enabled.
pub type HashFunction = fn(&str) -> u64;

/// Prefix of every hashed identifier. Reserved in GLSL ES, so it cannot clash with user names.
pub const HASHED_NAME_PREFIX: &str = "webgl_";

/// Default [`HashFunction`]: 64-bit XXH3 of the UTF-8 bytes.
pub fn xxh3_name_hash(name: &str) -> u64 {
    xxhash_rust::xxh3::xxh3_64(name.as_bytes())
}

/// Original name -> hashed name, for every identifier hashed during one compile.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NameMap {
    map: BTreeMap<String, String>,
}

impl NameMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.map.get(name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Pairs in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.map.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn clear(&mut self) {
        self.map.clear();
    }

    /// Hashes `name` through `hash`, memoizing the result. Empty names and a missing hash
    /// function leave the name untouched.
    pub fn hash_name(&mut self, name: &str, hash: Option<HashFunction>) -> String {
        let Some(hash) = hash else {
            return name.to_owned();
        };
        if name.is_empty() {
            return String::new();
        }
        if let Some(hashed) = self.map.get(name) {
            return hashed.clone();
        }
        let hashed = format!("{HASHED_NAME_PREFIX}{:x}", hash(name));
        self.map.insert(name.to_owned(), hashed.clone());
        hashed
    }
}

/// Spelling of a built-in texture lookup function in the target dialect.
///
/// Desktop GLSL 1.30 and later only have the overloaded `texture*` family; older desktop GLSL
/// spells the ESSL extension functions without the `EXT` suffix. ESSL output is unchanged.
pub fn translate_texture_function(name: &str, output: OutputType) -> &str {
    let OutputType::Glsl { version } = output else {
        return name;
    };
    if version >= 130 {
        match name {
            "texture2D" | "textureCube" | "texture2DRect" => "texture",
            "texture2DProj" | "texture2DRectProj" => "textureProj",
            "texture2DLod" | "textureCubeLod" | "texture2DLodEXT" | "textureCubeLodEXT" => {
                "textureLod"
            }
            "texture2DProjLod" | "texture2DProjLodEXT" => "textureProjLod",
            "texture2DGradEXT" | "textureCubeGradEXT" => "textureGrad",
            "texture2DProjGradEXT" => "textureProjGrad",
            _ => name,
        }
    } else {
        match name {
            "texture2DLodEXT" => "texture2DLod",
            "texture2DProjLodEXT" => "texture2DProjLod",
            "textureCubeLodEXT" => "textureCubeLod",
            "texture2DGradEXT" => "texture2DGradARB",
            "texture2DProjGradEXT" => "texture2DProjGradARB",
            "textureCubeGradEXT" => "textureCubeGradARB",
            _ => name,
        }
    }
}

/// Spelling of a built-in variable in the target dialect.
pub fn translate_builtin_variable(name: &str, output: OutputType) -> &str {
    match (name, output) {
        ("gl_FragDepthEXT", OutputType::Glsl { .. }) => "gl_FragDepth",
        _ => name,
    }
}
