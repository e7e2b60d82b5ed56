//! Material (`matl`) encoder.
//!
//! A material occupies three segments:
//!
//! | segment | flags | align | contents |
//! |---|---|---|---|
//! | header | `HEADER` | 8 | fixed [`MATERIAL_HEADER_SIZE`] record |
//! | data | `DATA` | 64 | name, texture GUIDs, streaming slots, surface name |
//! | cpu | `DATA \| CPU` | 16 | 16-byte cpu header, then cpu data |
//!
//! Shader, shader set and colpass references are GUID slots resolved by the
//! runtime loader. Texture references must name textures of the same pak.
//! World (`wldc`) materials register their shader slots without declaring
//! them as relations.
//!
//! The name is padded to `align_up(len + 1, 8)` before the texture GUID
//! table. This departs from the `len + len % 4` padding of older pak
//! tools, which can leave the GUID table on a 4-byte boundary; GUID slots
//! must be 8-aligned.

use super::{AssetEncoder, DEFAULT_USE_HINT, EncodeContext};
use crate::error::{AssetResult, ConfigError, ConfigResult};
use crate::keyvalues::KeyValues;
use crate::manifest::AssetDescriptor;
use repak_format::{AssetEntry, AssetKind, Guid, PakBuilder, SegmentFlags, align_up};
use std::str::FromStr;
use tracing::{debug, warn};

/// Default material format version
pub const MATERIAL_VERSION: u32 = 16;

/// Size of the material header record
pub const MATERIAL_HEADER_SIZE: u32 = 0xD0;

/// Size of the cpu header at the start of the cpu segment
pub const MATERIAL_CPU_HEADER_SIZE: u32 = 0x10;

/// Size of the cpu data following the cpu header
pub const MATERIAL_CPU_DATA_SIZE: u32 = 0x220;

/// Number of shader slots in the header
pub const SHADER_SLOTS: usize = 4;

// Header field offsets
const GUID: u32 = 0x10;
const NAME: u32 = 0x18;
const SURFACE: u32 = 0x20;
const SHADERS: u32 = 0x30;
const COLPASS: u32 = 0x50;
const SHADER_SET: u32 = 0x58;
const TEXTURES: u32 = 0x60;
const STREAMING_TEXTURES: u32 = 0x68;
const TEXTURE_COUNT: u32 = 0x70;
const WIDTH: u32 = 0x72;
const HEIGHT: u32 = 0x74;
const FLAGS2: u32 = 0x84;
const RENDER_STATE: u32 = 0x88;
const RENDER_STATE_STRIDE: u32 = 0x20;

/// Material subtype
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MaterialType {
    /// Skinned model material
    #[default]
    Skn,
    /// Skinned model material, alternate shader set
    Skn01,
    /// World geometry material
    Wldc,
    /// Generic material (menus, loadscreens)
    Gen,
}

/// Constant header fields of one material subtype
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MaterialTypeInfo {
    /// Name used in manifests and the asset path
    pub name: &'static str,
    /// Shader GUIDs; zero slots stay empty
    pub shaders: [u64; SHADER_SLOTS],
    /// Whether the shader slots are declared as relations; the slots are
    /// registered as GUID descriptors either way
    pub shader_relations: bool,
    /// Shader set GUID
    pub shader_set: u64,
    /// Second flag word
    pub flags2: u32,
    /// Render state words, written to both render sections
    pub render_state: [u32; 6],
}

static MATERIAL_TYPES: [MaterialTypeInfo; 4] = [
    MaterialTypeInfo {
        name: "skn",
        shaders: [
            0xA472_8358_C3B0_43CA,
            0x370B_ABA9_D914_7F3D,
            0x12DC_E947_0848_7F8C,
            0,
        ],
        shader_relations: true,
        shader_set: 0xC3AC_AF7F_1DC7_F389,
        flags2: 0x5600_0020,
        render_state: [
            0xF013_8004,
            0xF013_8004,
            0xF013_8004,
            0x0013_8004,
            0x0000_0004,
            0x0006_0017,
        ],
    },
    MaterialTypeInfo {
        name: "skn_01",
        shaders: [
            0x39C7_39E9_928E_555C,
            0x67D8_9B36_EDCD_DF6E,
            0x43A9_D8D4_2969_8B9F,
            0,
        ],
        shader_relations: true,
        shader_set: 0x5867_83F7_1E99_553D,
        flags2: 0,
        render_state: [0; 6],
    },
    MaterialTypeInfo {
        name: "wldc",
        shaders: [
            0x435F_A77E_363B_EA48,
            0xF734_F96B_E92E_0E71,
            0xD306_3709_1862_0EC0,
            0xDAB1_7AEA_D2D3_387A,
        ],
        shader_relations: false,
        shader_set: 0x4B0F_3B4C_BD00_9096,
        flags2: 0,
        render_state: [0; 6],
    },
    MaterialTypeInfo {
        name: "gen",
        shaders: [0; SHADER_SLOTS],
        shader_relations: true,
        shader_set: 0xA5B8_D4E9_A336_4655,
        flags2: 0,
        render_state: [0; 6],
    },
];

impl MaterialType {
    /// Every subtype, in table order
    pub const ALL: [Self; 4] = [Self::Skn, Self::Skn01, Self::Wldc, Self::Gen];

    /// Constant fields of this subtype
    pub fn info(self) -> &'static MaterialTypeInfo {
        &MATERIAL_TYPES[self as usize]
    }

    /// Subtype name
    pub fn name(self) -> &'static str {
        self.info().name
    }

    /// Look up a subtype by name
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }
}

/// Validated material
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaterialDefinition {
    /// Asset path from the manifest
    pub path: String,
    /// Subtype
    pub material_type: MaterialType,
    /// Material format version
    pub version: u32,
    /// Width hint
    pub width: u16,
    /// Height hint
    pub height: u16,
    /// Surface property name
    pub surface: String,
    /// Texture paths per slot; empty strings mark unused slots
    pub textures: Vec<String>,
    /// Optional collision pass material
    pub colpass: Option<String>,
}

impl MaterialDefinition {
    /// Path hashed into the asset GUID
    pub fn asset_path(&self) -> String {
        format!("material/{}_{}.rpak", self.path, self.material_type.name())
    }

    /// Asset GUID
    pub fn guid(&self) -> Guid {
        Guid::from_path(&self.asset_path())
    }

    /// GUID of each texture slot, `None` for unused slots
    pub fn texture_guids(&self) -> impl Iterator<Item = Option<Guid>> + '_ {
        self.textures.iter().map(|texture| {
            (!texture.is_empty()).then(|| Guid::from_path(&format!("{texture}.rpak")))
        })
    }

    /// GUID of the colpass material
    pub fn colpass_guid(&self) -> Option<Guid> {
        self.colpass
            .as_deref()
            .map(|colpass| Guid::from_path(&format!("material/{colpass}.rpak")))
    }
}

/// Manifest fields, with definition-file values as fallback
struct Fields<'a> {
    asset: &'a str,
    descriptor: &'a AssetDescriptor,
    definition: Option<&'a KeyValues>,
}

impl Fields<'_> {
    fn text(&self, field: &str) -> ConfigResult<Option<String>> {
        if let Some(value) = self.descriptor.str_field(field)? {
            return Ok(Some(value.to_string()));
        }
        Ok(self
            .definition
            .and_then(|kv| kv.value(field))
            .map(str::to_string))
    }

    fn number<T>(&self, field: &str) -> ConfigResult<Option<T>>
    where
        T: TryFrom<u64> + FromStr,
    {
        if let Some(value) = self.descriptor.uint_field(field)? {
            return Ok(Some(value));
        }
        self.definition
            .and_then(|kv| kv.value(field))
            .map(|raw| {
                raw.trim().parse().map_err(|_| {
                    ConfigError::invalid(self.asset, field, format!("'{raw}' is not a valid number"))
                })
            })
            .transpose()
    }

    fn textures(&self) -> ConfigResult<Vec<String>> {
        if let Some(textures) = self.descriptor.string_array("textures")? {
            return Ok(textures);
        }
        let Some(block) = self.definition.and_then(|kv| kv.nested("textures")) else {
            return Ok(Vec::new());
        };

        let mut slots = Vec::new();
        for (key, path) in block.values() {
            let slot: u16 = key.parse().map_err(|_| {
                ConfigError::invalid(self.asset, "textures", format!("'{key}' is not a slot number"))
            })?;
            let slot = usize::from(slot);
            if slots.len() <= slot {
                slots.resize(slot + 1, String::new());
            }
            slots[slot] = path.to_string();
        }
        Ok(slots)
    }
}

/// Encoder for materials
#[derive(Debug, Clone, Copy, Default)]
pub struct MaterialEncoder;

impl MaterialEncoder {
    fn load_definition(
        asset: &str,
        descriptor: &AssetDescriptor,
        ctx: &EncodeContext,
    ) -> AssetResult<Option<KeyValues>> {
        let Some(file) = descriptor.str_field("definition")? else {
            return Ok(None);
        };
        let path = ctx.input_path(file);
        let bytes = ctx.read(&path)?;
        let text = String::from_utf8(bytes)
            .map_err(|_| ConfigError::invalid(asset, "definition", "file is not valid UTF-8"))?;
        let kv = KeyValues::parse(&text).map_err(|source| ConfigError::Definition {
            asset: asset.to_string(),
            path,
            source,
        })?;
        Ok(Some(kv))
    }
}

impl AssetEncoder for MaterialEncoder {
    type Definition = MaterialDefinition;

    const KIND: AssetKind = AssetKind::MATERIAL;

    fn parse(descriptor: &AssetDescriptor, ctx: &EncodeContext) -> AssetResult<MaterialDefinition> {
        let asset = descriptor.path()?;
        let definition = Self::load_definition(asset, descriptor, ctx)?;
        let fields = Fields {
            asset,
            descriptor,
            definition: definition.as_ref(),
        };

        let material_type = match fields.text("type")? {
            Some(name) => MaterialType::from_name(&name).ok_or_else(|| {
                ConfigError::invalid(asset, "type", format!("unknown material type '{name}'"))
            })?,
            None => {
                warn!("Material '{}' has no type, assuming 'skn'", asset);
                MaterialType::default()
            }
        };

        let version = match fields.number::<u32>("version")? {
            Some(version) => version,
            None => {
                warn!(
                    "Material '{}' has no version, assuming {}",
                    asset, MATERIAL_VERSION
                );
                MATERIAL_VERSION
            }
        };

        let textures = fields.textures()?;
        if textures.is_empty() {
            return Err(ConfigError::NoTextures {
                asset: asset.to_string(),
            }
            .into());
        }
        if textures.len() > usize::from(u16::MAX) {
            return Err(ConfigError::invalid(asset, "textures", "too many texture slots").into());
        }

        Ok(MaterialDefinition {
            path: asset.to_string(),
            material_type,
            version,
            width: fields.number("width")?.unwrap_or(0),
            height: fields.number("height")?.unwrap_or(0),
            surface: fields.text("surface")?.unwrap_or_else(|| "default".to_string()),
            textures,
            colpass: fields.text("colpass")?.filter(|colpass| !colpass.is_empty()),
        })
    }

    fn emit(definition: &MaterialDefinition, builder: &mut PakBuilder) -> AssetResult<u32> {
        let index = builder.next_asset_index();
        let info = definition.material_type.info();
        let guid = definition.guid();

        let slots_size = definition.textures.len() as u64 * 8;
        let guids_offset = align_up(definition.path.len() as u64 + 1, 8);
        let streaming_offset = guids_offset + slots_size;
        let surface_offset = streaming_offset + slots_size;
        let data_size = surface_offset + definition.surface.len() as u64 + 1;

        let mut header = builder.create_buffer(
            u64::from(MATERIAL_HEADER_SIZE),
            SegmentFlags::HEADER,
            8,
        )?;
        let mut data = builder.create_buffer(data_size, SegmentFlags::DATA, 64)?;
        let mut cpu = builder.create_buffer(
            u64::from(MATERIAL_CPU_HEADER_SIZE + MATERIAL_CPU_DATA_SIZE),
            SegmentFlags::DATA | SegmentFlags::CPU,
            16,
        )?;

        // data: name, texture GUIDs, zeroed streaming slots, surface
        data.write_cstr(0, &definition.path)?;
        for (slot, texture) in definition.texture_guids().enumerate() {
            if let Some(texture) = texture {
                let offset = guids_offset as u32 + slot as u32 * 8;
                builder.write_guid_ref(&mut data, offset, texture)?;
                builder.add_asset_relation(index, texture)?;
            }
        }
        data.write_cstr(surface_offset as usize, &definition.surface)?;

        // header
        header.write_u64(GUID as usize, guid.value())?;
        builder.write_pointer(&mut header, NAME, data.ptr(0))?;
        builder.write_pointer(&mut header, SURFACE, data.ptr(surface_offset as u32))?;

        let mut runtime_refs = 0;
        for (slot, shader) in info.shaders.iter().enumerate() {
            if *shader != 0 {
                builder.write_guid_ref(&mut header, SHADERS + slot as u32 * 8, Guid(*shader))?;
                if info.shader_relations {
                    runtime_refs += 1;
                }
            }
        }
        if info.shader_set != 0 {
            builder.write_guid_ref(&mut header, SHADER_SET, Guid(info.shader_set))?;
            runtime_refs += 1;
        }
        if let Some(colpass) = definition.colpass_guid() {
            builder.write_guid_ref(&mut header, COLPASS, colpass)?;
            runtime_refs += 1;
        }
        builder.add_file_relation(index, runtime_refs);

        builder.write_pointer(&mut header, TEXTURES, data.ptr(guids_offset as u32))?;
        builder.write_pointer(
            &mut header,
            STREAMING_TEXTURES,
            data.ptr(streaming_offset as u32),
        )?;
        header.write_u16(TEXTURE_COUNT as usize, definition.textures.len() as u16)?;
        header.write_u16(WIDTH as usize, definition.width)?;
        header.write_u16(HEIGHT as usize, definition.height)?;
        header.write_u32(FLAGS2 as usize, info.flags2)?;
        for section in 0..2 {
            let base = RENDER_STATE + section * RENDER_STATE_STRIDE;
            for (word, value) in info.render_state.iter().enumerate() {
                header.write_u32((base + word as u32 * 4) as usize, *value)?;
            }
        }

        // cpu: header pointing at the data that follows it
        let cpu_data = cpu.ptr(MATERIAL_CPU_HEADER_SIZE);
        builder.write_pointer(&mut cpu, 0, cpu_data)?;
        cpu.write_u32(8, MATERIAL_CPU_DATA_SIZE)?;

        let mut entry = AssetEntry::new(
            guid,
            Self::KIND,
            header.ptr(0),
            MATERIAL_HEADER_SIZE,
            cpu.ptr(0),
            definition.version,
        );
        entry.use_hint = DEFAULT_USE_HINT;

        builder.add_buffer(header)?;
        builder.add_buffer(data)?;
        builder.add_buffer(cpu)?;
        let index = builder.add_asset_entry(entry)?;

        debug!(
            "Encoded material '{}' ({}) as {} with {} textures",
            definition.path,
            definition.material_type.name(),
            guid,
            definition.textures.len()
        );
        Ok(index)
    }
}
