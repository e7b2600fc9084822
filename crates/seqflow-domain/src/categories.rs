//! Catálogo constante de categorías (sólo lectura).
//!
//! Cada categoría es un enum con id numérico estable, nombre y nombre de
//! presentación. Los ids son los que se guardan en las tablas.
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub trait Category: Copy + Eq + std::fmt::Debug + 'static {
    fn id(&self) -> i64;
    fn name(&self) -> &'static str;
    fn all() -> &'static [Self];

    /// Nombre que ve el usuario (p.ej. en un dropdown).
    fn display_name(&self) -> String {
        self.name().to_string()
    }

    fn from_id(id: i64) -> Option<Self> {
        Self::all().iter().copied().find(|c| c.id() == id)
    }

    fn from_display_name(name: &str) -> Option<Self> {
        Self::all().iter().copied().find(|c| c.display_name() == name)
    }

    /// Pares `(id, display_name)` en orden de declaración.
    fn options() -> Vec<(i64, String)> {
        Self::all().iter().map(|c| (c.id(), c.display_name())).collect()
    }
}

macro_rules! category {
    ($(#[$meta:meta])* $ty:ident { $($variant:ident = ($id:expr, $name:expr)),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub enum $ty {
            $($variant),+
        }

        impl Category for $ty {
            fn id(&self) -> i64 {
                match self {
                    $($ty::$variant => $id),+
                }
            }

            fn name(&self) -> &'static str {
                match self {
                    $($ty::$variant => $name),+
                }
            }

            fn all() -> &'static [Self] {
                &[$($ty::$variant),+]
            }
        }
    };
}

category!(
    /// Tipo de librería secuenciada.
    LibraryType {
        Custom = (0, "Custom"),
        TenxScGexFlex = (1, "10X Flex Gene Expression"),
        TenxScAtac = (2, "10X Single Cell ATAC"),
        TenxScGex3Prime = (3, "10X Single Cell 3-P Gene Expression"),
        TenxScGex5Prime = (4, "10X Single Cell 5-P Gene Expression"),
        TenxVisiumHd = (5, "10X HD Spatial Gene Expression"),
        TenxVisiumFfpe = (6, "10X Visium Gene Expression FFPE"),
        TenxVisium = (7, "10X Visium Gene Expression"),
        TenxAntibodyCapture = (8, "10X Antibody Capture"),
        TenxMuxOligo = (9, "10X Multiplexing Oligo Capture"),
        TenxCrisprScreening = (10, "10X CRISPR Screening"),
        TenxVdjB = (11, "10X BCR Profiling (VDJ-B)"),
        TenxVdjT = (12, "10X TCR alpha-beta Profiling (VDJ-T)"),
        TenxVdjTGd = (13, "10X TCR gamma-delta Profiling (VDJ-T-GD)"),
        TenxScAbcFlex = (14, "10X Flex Antibody Capture"),
        OpenSt = (50, "Open Spatial Transcriptomics"),
        PolyARnaSeq = (101, "Poly-A RNA-Seq"),
        SmartSeq = (102, "Smart-Seq2"),
        SmartScSeq = (103, "Smart-Seq2 Single Cell"),
        RiboDeplRnaSeq = (104, "Stranded RNA-Seq Ribosomal RNA Depletion"),
        QuantSeq = (105, "QuantSeq 3' mRNA-Seq V2"),
        Wgs = (106, "Whole Genome Sequencing"),
        Wes = (107, "Whole Exome Sequencing"),
        AtacSeq = (108, "ATAC-Seq"),
        RrBsSeq = (109, "Reduced Representation Bisulfite Sequencing"),
        WgBsSeq = (110, "Whole Genome Bisulfite Sequencing"),
        RrEmSeq = (111, "Reduced Representation Enzymatic Methylation Sequencing"),
        WgEmSeq = (112, "Whole Genome Enzymatic Methylation Sequencing"),
        ArticSarsCov2 = (113, "ARTIC SARS-CoV-2"),
        ImmuneSeq = (114, "Immune Sequencing"),
        AmpliconSeq = (115, "Amplicon-seq"),
        CutAndRun = (116, "Cut & Run"),
    }
);

impl LibraryType {
    /// Identificador corto, único, usado como sufijo del nombre de librería.
    pub fn identifier(&self) -> &'static str {
        use LibraryType::*;
        match self {
            Custom => "CUSTOM",
            TenxScGexFlex => "10XFLEXGEX",
            TenxScAtac => "10XATAC",
            TenxScGex3Prime => "10XGEX3P",
            TenxScGex5Prime => "10XGEX5P",
            TenxVisiumHd => "10XVISIUMHD",
            TenxVisiumFfpe => "10XVISIUMFFPE",
            TenxVisium => "10XVISIUM",
            TenxAntibodyCapture => "10XABC",
            TenxMuxOligo => "10XOMUX",
            TenxCrisprScreening => "10XCRISPR",
            TenxVdjB => "10XVDJB",
            TenxVdjT => "10XVDJT",
            TenxVdjTGd => "10XVDJTGD",
            TenxScAbcFlex => "10XFLEXABC",
            OpenSt => "OPENST",
            PolyARnaSeq => "POLYARNA",
            SmartSeq => "SMARTSEQ2",
            SmartScSeq => "SMARTSEQSC2",
            RiboDeplRnaSeq => "RRNADEPL",
            QuantSeq => "QUANTSEQ",
            Wgs => "WGS",
            Wes => "WES",
            AtacSeq => "ATAC",
            RrBsSeq => "RRBS",
            WgBsSeq => "WGBS",
            RrEmSeq => "RREMSEQ",
            WgEmSeq => "WGEM",
            ArticSarsCov2 => "ARTIC",
            ImmuneSeq => "IMMUNE",
            AmpliconSeq => "AMPLICON",
            CutAndRun => "CUTNRUN",
        }
    }

    /// Búsqueda inversa por `identifier` (p.ej. al reabrir nombres de librería).
    pub fn from_identifier(identifier: &str) -> Option<Self> {
        static BY_IDENTIFIER: Lazy<HashMap<&'static str, LibraryType>> =
            Lazy::new(|| LibraryType::all().iter().map(|t| (t.identifier(), *t)).collect());
        BY_IDENTIFIER.get(identifier).copied()
    }

    pub fn is_visium(&self) -> bool {
        matches!(self, LibraryType::TenxVisiumHd | LibraryType::TenxVisiumFfpe | LibraryType::TenxVisium)
    }

    /// Librerías que requieren anotación de features (anticuerpos).
    pub fn needs_features(&self) -> bool {
        matches!(self, LibraryType::TenxAntibodyCapture | LibraryType::TenxScAbcFlex)
    }
}

category!(
    /// Ensayo elegido por el usuario; determina las librerías generadas.
    AssayType {
        Custom = (0, "Custom"),
        TenxScSinglePlexFlex = (10, "10X Single Cell Gene Expression Flex Single-Plex"),
        TenxScAtac = (11, "10X Single Cell ATAC"),
        TenxScGex3Prime = (12, "10X Single Cell Gene Expression 3'"),
        TenxScGex5Prime = (13, "10X Single Cell Immune Profiling 5'"),
        TenxScMultiome = (14, "10X Single Cell Multiome"),
        TenxSc4PlexFlex = (15, "10X Single Cell Gene Expression Flex 4-Plex"),
        TenxSc16PlexFlex = (16, "10X Single Cell Gene Expression Flex 16-Plex"),
        OpenSt = (50, "Open Spatial Transcriptomics"),
        PolyARnaSeq = (101, "Poly-A RNA-Seq"),
        RiboDeplRnaSeq = (102, "Ribo Depletion RNA-Seq"),
        QuantSeq = (103, "QuantSeq 3' mRNA-Seq V2"),
        SmartSeq = (104, "Full-length RNA-seq from single cells using Smart-seq2"),
        Wgs = (105, "Whole Genome Sequencing"),
        Wes = (106, "Whole Exome Sequencing"),
        WgBsSeq = (107, "Whole Genome Bisulfite Sequencing"),
        RrBsSeq = (108, "Reduced Representation Bisulfite Sequencing"),
        WgEmSeq = (109, "Whole Genome Enzymatic Methylation Sequencing"),
        RrEmSeq = (110, "Reduced Representation Enzymatic Methylation Sequencing"),
        AtacSeq = (111, "ATAC-Seq"),
        ArticSarsCov2 = (112, "ARTIC SARS-CoV-2"),
        ImmuneSeq = (113, "NEBNext Immune sequencing"),
    }
);

impl AssayType {
    pub fn abbreviation(&self) -> &'static str {
        use AssayType::*;
        match self {
            Custom => "Custom",
            TenxScSinglePlexFlex => "10X Flex Single-Plex",
            TenxScAtac => "10X ATAC",
            TenxScGex3Prime => "10X 3'",
            TenxScGex5Prime => "10X 5'",
            TenxScMultiome => "10X Multiome",
            TenxSc4PlexFlex => "10X Flex 4-Plex",
            TenxSc16PlexFlex => "10X Flex 16-Plex",
            OpenSt => "Open-ST",
            PolyARnaSeq => "Poly-A RNA-Seq",
            RiboDeplRnaSeq => "Ribo Depletion RNA-Seq",
            QuantSeq => "Quant-Seq",
            SmartSeq => "Smart-Seq2",
            Wgs => "WGS",
            Wes => "WES",
            WgBsSeq => "WG BS-Seq",
            RrBsSeq => "RR BS-Seq",
            WgEmSeq => "WG EM-Seq",
            RrEmSeq => "RR EM-Seq",
            AtacSeq => "ATAC-Seq",
            ArticSarsCov2 => "ARTIC SARS-CoV-2",
            ImmuneSeq => "Immune-Seq",
        }
    }

    /// Librerías que el ensayo produce siempre.
    pub fn library_types(&self) -> &'static [LibraryType] {
        use AssayType as A;
        use LibraryType as L;
        match self {
            A::Custom => &[],
            A::TenxScSinglePlexFlex | A::TenxSc4PlexFlex | A::TenxSc16PlexFlex => &[L::TenxScGexFlex],
            A::TenxScAtac => &[L::TenxScAtac],
            A::TenxScGex3Prime => &[L::TenxScGex3Prime],
            A::TenxScGex5Prime => &[L::TenxScGex5Prime],
            A::TenxScMultiome => &[L::TenxScGex3Prime, L::TenxScAtac],
            A::OpenSt => &[L::OpenSt],
            A::PolyARnaSeq => &[L::PolyARnaSeq],
            A::RiboDeplRnaSeq => &[L::RiboDeplRnaSeq],
            A::QuantSeq => &[L::QuantSeq],
            A::SmartSeq => &[L::SmartSeq],
            A::Wgs => &[L::Wgs],
            A::Wes => &[L::Wes],
            A::WgBsSeq => &[L::WgBsSeq],
            A::RrBsSeq => &[L::RrBsSeq],
            A::WgEmSeq => &[L::WgEmSeq],
            A::RrEmSeq => &[L::RrEmSeq],
            A::AtacSeq => &[L::AtacSeq],
            A::ArticSarsCov2 => &[L::ArticSarsCov2],
            A::ImmuneSeq => &[L::ImmuneSeq],
        }
    }

    /// Librerías opcionales que el usuario puede agregar al ensayo.
    pub fn optional_library_types(&self) -> &'static [LibraryType] {
        use AssayType as A;
        use LibraryType as L;
        match self {
            A::TenxScSinglePlexFlex | A::TenxSc4PlexFlex | A::TenxSc16PlexFlex => &[L::TenxScAbcFlex],
            A::TenxScGex3Prime => &[L::TenxAntibodyCapture],
            A::TenxScGex5Prime => &[L::TenxAntibodyCapture, L::TenxCrisprScreening, L::TenxVdjB, L::TenxVdjT, L::TenxVdjTGd],
            _ => &[],
        }
    }

    pub fn oligo_multiplexing(&self) -> bool {
        matches!(self, AssayType::TenxScGex3Prime | AssayType::TenxScGex5Prime | AssayType::TenxScMultiome)
    }

    pub fn ocm_multiplexing(&self) -> bool {
        matches!(self, AssayType::TenxScGex3Prime | AssayType::TenxScGex5Prime)
    }

    pub fn is_flex(&self) -> bool {
        matches!(self, AssayType::TenxScSinglePlexFlex | AssayType::TenxSc4PlexFlex | AssayType::TenxSc16PlexFlex)
    }

    /// Flex con barcodes de sonda (multiplexado por diseño).
    pub fn is_flex_multiplexed(&self) -> bool {
        matches!(self, AssayType::TenxSc4PlexFlex | AssayType::TenxSc16PlexFlex)
    }
}

category!(
    /// Forma en que el usuario entrega el material.
    SubmissionType {
        RawSamples = (1, "Raw Samples"),
        PooledLibraries = (2, "Pooled Libraries"),
        UnpooledLibraries = (3, "Unpooled Libraries"),
    }
);

category!(
    /// Estrategia de multiplexado de muestras.
    MuxType {
        TenxOligo = (1, "10X Oligo Multiplexing"),
        TenxOnChip = (2, "10X On-Chip Multiplexing"),
        TenxFlexProbe = (3, "10X Flex Probe Barcodes"),
        TenxAbcHash = (4, "10X Antibody-based Cell Hashing"),
    }
);

category!(
    IndexType {
        DualIndex = (1, "Dual Index"),
        SingleIndexI7 = (2, "Single Index (i7)"),
        CombinatorialDualIndex = (3, "Combinatorial Dual Index"),
        TenxAtacIndex = (4, "10X ATAC Index"),
    }
);

category!(
    BarcodeOrientation {
        Forward = (1, "Forward"),
        ForwardNotValidated = (2, "Forward (not validated)"),
    }
);

category!(
    GenomeRef {
        Custom = (0, "Custom"),
        Human = (1, "Human (GRCh38)"),
        Mouse = (2, "Mouse (GRCm39)"),
        Rat = (3, "Rat (mRatBN7.2)"),
        Zebrafish = (4, "Zebrafish (GRCz11)"),
        Fly = (5, "Fruit fly (BDGP6)"),
        Yeast = (6, "Yeast (R64)"),
        SarsCov2 = (7, "SARS-CoV-2"),
    }
);

/// Rol de un barcode dentro del índice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BarcodeRole {
    I7,
    I5,
}

impl BarcodeRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            BarcodeRole::I7 => "i7",
            BarcodeRole::I5 => "i5",
        }
    }

    pub fn sequence_column(&self) -> String {
        format!("sequence_{}", self.as_str())
    }

    pub fn name_column(&self) -> String {
        format!("name_{}", self.as_str())
    }

    pub fn kit_column(&self) -> String {
        format!("kit_{}", self.as_str())
    }

    pub fn kit_id_column(&self) -> String {
        format!("kit_{}_id", self.as_str())
    }

    pub fn orientation_column(&self) -> String {
        format!("orientation_{}_id", self.as_str())
    }
}

impl IndexType {
    /// Roles que hay que resolver contra el catálogo.
    pub fn roles(&self) -> &'static [BarcodeRole] {
        match self {
            IndexType::DualIndex | IndexType::CombinatorialDualIndex => &[BarcodeRole::I7, BarcodeRole::I5],
            IndexType::SingleIndexI7 => &[BarcodeRole::I7],
            IndexType::TenxAtacIndex => &[],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn ids_and_identifiers_are_unique() {
        let ids: HashSet<_> = LibraryType::all().iter().map(|t| t.id()).collect();
        assert_eq!(ids.len(), LibraryType::all().len());
        let idents: HashSet<_> = LibraryType::all().iter().map(|t| t.identifier()).collect();
        assert_eq!(idents.len(), LibraryType::all().len());
        assert_eq!(LibraryType::from_identifier("10XVDJTGD"), Some(LibraryType::TenxVdjTGd));
    }

    #[test]
    fn lookup_by_id_and_display_name() {
        assert_eq!(AssayType::from_id(14), Some(AssayType::TenxScMultiome));
        assert_eq!(GenomeRef::from_display_name("Mouse (GRCm39)"), Some(GenomeRef::Mouse));
        assert_eq!(MuxType::from_id(99), None);
    }

    #[test]
    fn multiome_yields_gex_and_atac() {
        assert_eq!(AssayType::TenxScMultiome.library_types(), &[LibraryType::TenxScGex3Prime, LibraryType::TenxScAtac]);
        assert!(AssayType::TenxSc4PlexFlex.is_flex_multiplexed());
        assert!(!AssayType::TenxScSinglePlexFlex.is_flex_multiplexed());
    }

    #[test]
    fn dual_index_resolves_both_roles() {
        assert_eq!(IndexType::DualIndex.roles(), &[BarcodeRole::I7, BarcodeRole::I5]);
        assert_eq!(BarcodeRole::I5.kit_id_column(), "kit_i5_id");
    }
}
