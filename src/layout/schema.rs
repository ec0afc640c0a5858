use crate::error::{FeedError, Result};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// What a node in the payload is expected to look like.
#[derive(Debug, Clone, PartialEq)]
pub enum Expect {
    Str,
    Int,
    /// Accepts any JSON number; monetary fields serialize as `12.0` or `12`.
    Float,
    /// Any list, items unchecked.
    List,
    /// A homogeneous list where every item matches the template.
    Items(Box<Expect>),
    /// An object that must carry at least these fields. Extra fields pass.
    Object(BTreeMap<String, Expect>),
}

/// Layout the payload is checked against. Advisory only; nothing here ever
/// changes the payload.
#[derive(Debug, Clone)]
pub struct LayoutSpec {
    root: Expect,
}

impl LayoutSpec {
    pub fn load(sample: Option<&Path>) -> Result<Self> {
        match sample {
            Some(path) => Self::from_sample(path),
            None => Ok(Self::builtin()),
        }
    }

    /// The fields this pipeline actually fills in, with their wire types.
    pub fn builtin() -> Self {
        let address = object(vec![
            ("descr", Expect::Str),
            ("cep", Expect::Str),
            ("cidade", Expect::Str),
            ("uf", Expect::Str),
            ("tel", Expect::Str),
        ]);

        let establishment = object(vec![
            ("cod", Expect::Str),
            ("doc", Expect::Str),
            ("nome", Expect::Str),
            ("nomeOfc", Expect::Str),
            ("tipo", Expect::Str),
            ("ender", address.clone()),
            ("codIqvia", Expect::Str),
            ("tipoCaptacaoPrescricao", Expect::Int),
        ]);

        let customer = object(vec![
            ("tipo", Expect::Int),
            ("cod", Expect::Str),
            ("profSaude", Expect::Int),
            ("doc", Expect::Str),
            ("nome", Expect::Str),
            ("nomeOfc", Expect::Str),
            ("ender", address),
        ]);

        let product = object(vec![
            ("cod", Expect::Str),
            ("eanSellIn", Expect::Str),
            ("eanSellOut", Expect::Str),
            ("ncm", Expect::Str),
            ("apresent", Expect::Str),
            ("fabr", Expect::Str),
            ("precoFabrica", Expect::Float),
            ("dispViaFarmaciaPopular", Expect::Str),
            ("dispViaPbm", Expect::Str),
            ("marcaPropria", Expect::Str),
        ]);

        let price = object(vec![
            (
                "valor",
                object(vec![("liquido", Expect::Float), ("bruto", Expect::Float)]),
            ),
            (
                "icms",
                object(vec![
                    ("isento", Expect::Int),
                    ("aliq", Expect::Float),
                    ("valor", Expect::Float),
                    ("cst", Expect::Str),
                    (
                        "subsTrib",
                        object(vec![
                            ("valor", Expect::Int),
                            ("embutidoPreco", Expect::Int),
                            ("cest", Expect::Str),
                        ]),
                    ),
                ]),
            ),
        ]);

        let sale = object(vec![
            ("codEstab", Expect::Str),
            ("codCliente", Expect::Str),
            ("comPrescricao", Expect::Int),
            ("paraUsoProfSaude", Expect::Int),
            ("codProfSaude", Expect::Str),
            ("codProd", Expect::Str),
            ("dt", Expect::Str),
            ("qt", Expect::Int),
            ("ecommerce", Expect::Int),
            ("meio", Expect::Int),
            ("docTipo", Expect::Int),
            ("docFiscalSerie", Expect::Str),
            ("docFiscalNum", Expect::Int),
            ("danfe", Expect::Str),
            ("vendaJudic", Expect::Int),
            ("tipoPagto", Expect::Int),
            ("preco", price),
        ]);

        let stock_level = object(vec![
            ("codEstab", Expect::Str),
            ("codProd", Expect::Str),
            ("dt", Expect::Str),
            ("qt", Expect::Int),
        ]);

        let root = object(vec![
            ("data", Expect::Str),
            ("estabelecimentos", items(establishment)),
            ("clientes", items(customer)),
            ("produtos", items(product)),
            ("vendas", items(sale)),
            ("estoque", items(stock_level)),
        ]);

        Self { root }
    }

    /// Derives a layout from an official example file. The example is itself
    /// a payload, so it only vouches for the top-level shape; the check it
    /// produces is deliberately lighter than the built-in one.
    pub fn from_sample(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        serde_json::from_str::<Value>(&content).map_err(|e| FeedError::Config {
            message: format!(
                "sample layout {} is not valid JSON: {}",
                path.display(),
                e
            ),
        })?;

        let any_object = Expect::Object(BTreeMap::new());
        let root = object(vec![
            ("data", Expect::Str),
            ("estabelecimentos", items(any_object.clone())),
            ("clientes", items(any_object.clone())),
            ("produtos", items(any_object.clone())),
            ("vendas", items(any_object.clone())),
            ("estoque", items(any_object)),
        ]);

        Ok(Self { root })
    }

    pub(crate) fn root(&self) -> &Expect {
        &self.root
    }
}

fn object(fields: Vec<(&str, Expect)>) -> Expect {
    Expect::Object(
        fields
            .into_iter()
            .map(|(key, expect)| (key.to_string(), expect))
            .collect(),
    )
}

fn items(template: Expect) -> Expect {
    Expect::Items(Box::new(template))
}
