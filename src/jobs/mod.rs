//! Catalog of job kinds for the electoral platform
//!
//! Each job kind is an explicit registry entry: a [`JobSpec`] variant with
//! typed parameters, a static `(dataset, category, key_base)` descriptor for
//! key derivation, a queue priority, a request builder, a response shape
//! check, and a fan-out rule deriving child jobs from the fetched value.
//!
//! The cache bases, priorities, endpoints and request bodies follow the
//! platform's service API:
//! - `listas-regio-muni` enumerates the candidate lists of one electoral
//!   process and fans out into plan, expediente and candidate lookups;
//! - `expediente/detalle` reveals the candidates on an expediente and fans
//!   out into their hoja-de-vida records;
//! - `hoja-vida` reveals the identifiers needed for the candidate's
//!   government plan.

use crate::env::Environment;
use crate::harvest::FetchRequest;
use crate::key::{derive_key, ParamValue};
use crate::HarvestError;
use serde_json::{json, Value};

/// Reference datasets fetched during bootstrap, besides the environment
/// config itself
pub const REFERENCE_CONFIGS: [&str; 10] = [
    "config",
    "organizacion-politica",
    "jurado-electoral",
    "tipo-eleccion",
    "experiencia-laboral",
    "cargo-eleccion",
    "expediente-dadiva",
    "grado-academico",
    "sentencia-declarada",
    "ubigeo-consulta",
];

/// Static identity of a job kind: where its results live in the cache
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KindDescriptor {
    pub name: &'static str,
    pub dataset: &'static str,
    pub category: &'static str,
    pub key_base: &'static str,
}

/// One fully-parameterized unit of fetch-and-cache work
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobSpec {
    /// A bootstrap/reference dataset; executed outside the worker pool
    Config { config_type: String },

    /// Candidate lists for one electoral process and election type
    ListasRegioMuni {
        id_proceso_electoral: i64,
        id_tipo_eleccion: i64,
    },

    /// Government plan detail
    DetallePlan { id_plan_gobierno: i64 },

    /// Expediente detail; reveals the candidates on the expediente
    ExpedienteDetalle { expediente: String },

    /// Direct expediente search
    ExpedienteDirecto { expediente: String },

    /// Child expediente search
    ExpedienteHijo { expediente: String },

    /// Candidates associated with an expediente
    ExpedienteCandidatos {
        id_proceso_electoral: i64,
        expediente: String,
    },

    /// A candidate's hoja de vida; reveals their government plan identifiers
    CandidatoHojaVida { id_hoja_vida: i64 },

    /// Marginal annotations on a hoja de vida
    CandidatoAnotacionMarginal { id_hoja_vida: i64 },

    /// Expedientes related to a hoja de vida
    CandidatoExpedientesRelacionados { id_hoja_vida: i64 },

    /// Requisites of one candidate in one electoral process
    CandidatoRequisito {
        id_proceso_electoral: i64,
        id_candidato: i64,
    },

    /// Government plan detail scoped to one candidate's list
    CandidatoPlan {
        id_proceso_electoral: i64,
        id_tipo_eleccion: i64,
        id_organizacion_politica: i64,
        id_solicitud_lista: i64,
    },
}

impl JobSpec {
    /// Returns the static descriptor of this job's kind
    pub fn descriptor(&self) -> KindDescriptor {
        match self {
            JobSpec::Config { .. } => KindDescriptor {
                name: "config",
                dataset: "current",
                category: "config",
                key_base: "",
            },
            JobSpec::ListasRegioMuni { .. } => KindDescriptor {
                name: "listas-regio-muni",
                dataset: "current",
                category: "listas-regio-muni",
                key_base: "listas-regio-muni",
            },
            JobSpec::DetallePlan { .. } => KindDescriptor {
                name: "detalle-plan",
                dataset: "current",
                category: "candidatos-planes",
                key_base: "plan",
            },
            JobSpec::ExpedienteDetalle { .. } => KindDescriptor {
                name: "expediente-detalle",
                dataset: "current",
                category: "expedientes-detalles",
                key_base: "detalle",
            },
            JobSpec::ExpedienteDirecto { .. } => KindDescriptor {
                name: "expediente-directo",
                dataset: "current",
                category: "expedientes-directos",
                key_base: "directo",
            },
            JobSpec::ExpedienteHijo { .. } => KindDescriptor {
                name: "expediente-hijo",
                dataset: "current",
                category: "expedientes-hijos",
                key_base: "hijo",
            },
            JobSpec::ExpedienteCandidatos { .. } => KindDescriptor {
                name: "expediente-candidatos",
                dataset: "current",
                category: "expedientes-candidatos",
                key_base: "candidatos",
            },
            JobSpec::CandidatoHojaVida { .. } => KindDescriptor {
                name: "candidato-hojavida",
                dataset: "current",
                category: "candidatos-hojavidas",
                key_base: "hojavida",
            },
            JobSpec::CandidatoAnotacionMarginal { .. } => KindDescriptor {
                name: "candidato-anotacion-marginal",
                dataset: "current",
                category: "candidatos-anotaciones-marginales",
                key_base: "anotacion-marginal",
            },
            JobSpec::CandidatoExpedientesRelacionados { .. } => KindDescriptor {
                name: "candidato-expedientes-relacionados",
                dataset: "current",
                category: "candidatos-expedientes",
                key_base: "expedientes",
            },
            JobSpec::CandidatoRequisito { .. } => KindDescriptor {
                name: "candidato-requisito",
                dataset: "current",
                category: "candidatos-requisitos",
                key_base: "requisito",
            },
            JobSpec::CandidatoPlan { .. } => KindDescriptor {
                name: "candidato-plan",
                dataset: "current",
                category: "candidatos-planes-para-candidato",
                key_base: "plan",
            },
        }
    }

    /// Queue priority: lower values are served first
    ///
    /// Config jobs run during bootstrap, outside the pool, so their priority
    /// is never consulted.
    pub fn priority(&self) -> u32 {
        match self {
            JobSpec::Config { .. } => 0,
            JobSpec::ListasRegioMuni { .. } => 10,
            JobSpec::CandidatoHojaVida { .. } => 12,
            JobSpec::CandidatoAnotacionMarginal { .. } => 14,
            JobSpec::CandidatoExpedientesRelacionados { .. } => 16,
            JobSpec::CandidatoRequisito { .. } => 18,
            JobSpec::CandidatoPlan { .. } => 20,
            JobSpec::DetallePlan { .. } => 30,
            JobSpec::ExpedienteDetalle { .. } => 40,
            JobSpec::ExpedienteDirecto { .. } => 50,
            JobSpec::ExpedienteCandidatos { .. } => 60,
            JobSpec::ExpedienteHijo { .. } => 90,
        }
    }

    /// Derives the deterministic job key, which doubles as the cache path
    pub fn key(&self) -> String {
        let d = self.descriptor();
        let (positional, named): (Vec<ParamValue>, Vec<(&str, ParamValue)>) = match self {
            JobSpec::Config { config_type } => {
                (vec![config_type.as_str().into()], vec![])
            }
            JobSpec::ListasRegioMuni {
                id_proceso_electoral,
                id_tipo_eleccion,
            } => (
                vec![],
                vec![
                    ("id_proceso_electoral", (*id_proceso_electoral).into()),
                    ("id_tipo_eleccion", (*id_tipo_eleccion).into()),
                ],
            ),
            JobSpec::DetallePlan { id_plan_gobierno } => (
                vec![],
                vec![("id_plan_gobierno", (*id_plan_gobierno).into())],
            ),
            JobSpec::ExpedienteDetalle { expediente }
            | JobSpec::ExpedienteDirecto { expediente }
            | JobSpec::ExpedienteHijo { expediente } => (
                vec![],
                vec![("expediente", expediente.as_str().into())],
            ),
            JobSpec::ExpedienteCandidatos {
                id_proceso_electoral,
                expediente,
            } => (
                vec![],
                vec![
                    ("expediente", expediente.as_str().into()),
                    ("id_proceso_electoral", (*id_proceso_electoral).into()),
                ],
            ),
            JobSpec::CandidatoHojaVida { id_hoja_vida }
            | JobSpec::CandidatoAnotacionMarginal { id_hoja_vida }
            | JobSpec::CandidatoExpedientesRelacionados { id_hoja_vida } => (
                vec![],
                vec![("id_hoja_vida", (*id_hoja_vida).into())],
            ),
            JobSpec::CandidatoRequisito {
                id_proceso_electoral,
                id_candidato,
            } => (
                vec![],
                vec![
                    ("id_candidato", (*id_candidato).into()),
                    ("id_proceso_electoral", (*id_proceso_electoral).into()),
                ],
            ),
            JobSpec::CandidatoPlan {
                id_proceso_electoral,
                id_tipo_eleccion,
                id_organizacion_politica,
                id_solicitud_lista,
            } => (
                vec![],
                vec![
                    ("id_organizacion_politica", (*id_organizacion_politica).into()),
                    ("id_proceso_electoral", (*id_proceso_electoral).into()),
                    ("id_solicitud_lista", (*id_solicitud_lista).into()),
                    ("id_tipo_eleccion", (*id_tipo_eleccion).into()),
                ],
            ),
        };
        derive_key(d.dataset, d.category, d.key_base, &positional, &named)
    }

    /// Builds the external request for this job
    pub fn request(&self, env: &Environment) -> Result<FetchRequest, HarvestError> {
        match self {
            JobSpec::Config { config_type } => {
                let url = if config_type == "environment-config" {
                    env.bootstrap_url().to_string()
                } else {
                    reference_config_url(config_type, env)?
                };
                Ok(FetchRequest::Get { url, query: vec![] })
            }

            JobSpec::ListasRegioMuni {
                id_proceso_electoral,
                id_tipo_eleccion,
            } => Ok(FetchRequest::Post {
                url: format!(
                    "{}/api/v1/candidato/listas-regio-muni",
                    env.base("apiPath5")?
                ),
                body: json!({
                    "pageSize": 0,
                    "skip": 0,
                    "sortField": "",
                    "sortDir": "",
                    "filter": {
                        "idProcesoElectoral": id_proceso_electoral,
                        "idTipoEleccion": id_tipo_eleccion,
                        "idOrganizacionPolitica": 0,
                        "idJuradoElectoral": 0,
                        "txUbigeoDepartamento": "00",
                        "txUbigeoProvincia": "00",
                        "txUbigeoDistrito": "00",
                    },
                }),
            }),

            JobSpec::DetallePlan { id_plan_gobierno } => Ok(FetchRequest::Get {
                url: format!("{}/api/v1/plan-gobierno/detalle", env.base("apiPath2")?),
                query: vec![("IdPlanGobierno".to_string(), id_plan_gobierno.to_string())],
            }),

            JobSpec::ExpedienteDetalle { expediente } => Ok(FetchRequest::Get {
                url: format!("{}/api/v1/expediente/detalle", env.base("apiPath")?),
                query: vec![("CodExpedienteExt".to_string(), expediente.clone())],
            }),

            JobSpec::ExpedienteDirecto { expediente } => Ok(FetchRequest::Post {
                url: format!(
                    "{}/api/v1/expediente/consulta-expediente-directo",
                    env.base("apiPath3")?
                ),
                body: expediente_search_body(expediente),
            }),

            JobSpec::ExpedienteHijo { expediente } => Ok(FetchRequest::Post {
                url: format!(
                    "{}/api/v1/expediente/consulta-expediente-hijo",
                    env.base("apiPath3")?
                ),
                body: expediente_search_body(expediente),
            }),

            JobSpec::ExpedienteCandidatos {
                id_proceso_electoral,
                expediente,
            } => Ok(FetchRequest::Get {
                url: format!("{}/api/v1/plan-gobierno/candidatos", env.base("apiPath2")?),
                query: vec![
                    (
                        "IdProcesoElectoral".to_string(),
                        id_proceso_electoral.to_string(),
                    ),
                    ("TxCodExpedienteExt".to_string(), expediente.clone()),
                ],
            }),

            JobSpec::CandidatoHojaVida { id_hoja_vida } => Ok(FetchRequest::Get {
                url: format!("{}/api/v1/candidato/hoja-vida", env.base("apiPath7")?),
                query: vec![("IdHojaVida".to_string(), id_hoja_vida.to_string())],
            }),

            JobSpec::CandidatoAnotacionMarginal { id_hoja_vida } => Ok(FetchRequest::Get {
                url: format!(
                    "{}/api/v1/candidato/anotacion-marginal",
                    env.base("apiPath2")?
                ),
                query: vec![("IdHojaVida".to_string(), id_hoja_vida.to_string())],
            }),

            JobSpec::CandidatoExpedientesRelacionados { id_hoja_vida } => {
                Ok(FetchRequest::Get {
                    url: format!("{}/api/v1/candidato/expediente", env.base("apiPath5")?),
                    query: vec![("IdHojaVida".to_string(), id_hoja_vida.to_string())],
                })
            }

            JobSpec::CandidatoRequisito {
                id_proceso_electoral,
                id_candidato,
            } => Ok(FetchRequest::Post {
                url: format!(
                    "{}/api/v1/expediente/candidato-requisito",
                    env.base("apiPath2")?
                ),
                body: json!({
                    "idProcesoElectoral": id_proceso_electoral,
                    "idCandidato": id_candidato,
                }),
            }),

            JobSpec::CandidatoPlan {
                id_proceso_electoral,
                id_tipo_eleccion,
                id_organizacion_politica,
                id_solicitud_lista,
            } => Ok(FetchRequest::Get {
                url: format!(
                    "{}/api/v1/plan-gobierno/detalle-para-candidato",
                    env.base("apiPath8")?
                ),
                query: vec![
                    (
                        "IdProcesoElectoral".to_string(),
                        id_proceso_electoral.to_string(),
                    ),
                    ("IdTipoEleccion".to_string(), id_tipo_eleccion.to_string()),
                    (
                        "IdOrganizacionPolitica".to_string(),
                        id_organizacion_politica.to_string(),
                    ),
                    (
                        "IdSolicitudLista".to_string(),
                        id_solicitud_lista.to_string(),
                    ),
                ],
            }),
        }
    }

    /// Checks the expected shape of a fetched response
    ///
    /// A violation is fatal to this job: the value must never be persisted
    /// and no children are derived from it.
    pub fn validate(&self, value: &Value) -> Result<(), HarvestError> {
        match self {
            JobSpec::ExpedienteDetalle { .. } => {
                if value.get("datoGeneral").is_none() {
                    return Err(self.malformed("missing field 'datoGeneral'"));
                }
                Ok(())
            }

            // These searches are issued with an unbounded page size, so the
            // platform must answer with zero or exactly one page.
            JobSpec::ExpedienteHijo { .. } | JobSpec::ExpedienteDirecto { .. } => {
                let count = self.int_field(value, "count")?;
                let total_pages = self.int_field(value, "totalPages")?;
                if (count == 0 && total_pages == 0) || total_pages == 1 {
                    Ok(())
                } else {
                    Err(self.malformed(format!(
                        "expected zero or one page of results, got count={} totalPages={}",
                        count, total_pages
                    )))
                }
            }

            _ => Ok(()),
        }
    }

    /// Derives the child jobs discovered by this job's result
    ///
    /// Children are derived from cached values too, so an interrupted run
    /// picks the graph back up from what it already knows.
    pub fn children(&self, value: &Value) -> Result<Vec<JobSpec>, HarvestError> {
        match self {
            JobSpec::ListasRegioMuni {
                id_proceso_electoral,
                ..
            } => {
                let rows = value
                    .get("data")
                    .and_then(Value::as_array)
                    .ok_or_else(|| self.malformed("missing array 'data'"))?;

                let mut children = Vec::with_capacity(rows.len() * 5);
                for row in rows {
                    let id_plan_gobierno = self.int_field(row, "idPlanGobierno")?;
                    let expediente = self.str_field(row, "txCodExpedienteExt")?;

                    children.push(JobSpec::DetallePlan { id_plan_gobierno });
                    children.push(JobSpec::ExpedienteDetalle {
                        expediente: expediente.clone(),
                    });
                    children.push(JobSpec::ExpedienteDirecto {
                        expediente: expediente.clone(),
                    });
                    children.push(JobSpec::ExpedienteCandidatos {
                        id_proceso_electoral: *id_proceso_electoral,
                        expediente: expediente.clone(),
                    });
                    children.push(JobSpec::ExpedienteHijo { expediente });
                }
                Ok(children)
            }

            JobSpec::ExpedienteDetalle { .. } => {
                let rows = value
                    .get("expedienteCandidato")
                    .and_then(Value::as_array)
                    .ok_or_else(|| self.malformed("missing array 'expedienteCandidato'"))?;

                let mut children = Vec::with_capacity(rows.len() * 4);
                for row in rows {
                    let id_proceso_electoral = self.int_field(row, "idProcesoElectoral")?;
                    let id_candidato = self.int_field(row, "idCandidato")?;
                    let id_hoja_vida = self.int_field(row, "idHojaVida")?;

                    children.push(JobSpec::CandidatoHojaVida { id_hoja_vida });
                    children.push(JobSpec::CandidatoAnotacionMarginal { id_hoja_vida });
                    children.push(JobSpec::CandidatoExpedientesRelacionados { id_hoja_vida });
                    children.push(JobSpec::CandidatoRequisito {
                        id_proceso_electoral,
                        id_candidato,
                    });
                }
                Ok(children)
            }

            JobSpec::CandidatoHojaVida { .. } => {
                let dato_general = value
                    .get("datoGeneral")
                    .ok_or_else(|| self.malformed("missing field 'datoGeneral'"))?;

                Ok(vec![JobSpec::CandidatoPlan {
                    id_proceso_electoral: self.int_field(dato_general, "idProcesoElectoral")?,
                    id_tipo_eleccion: self.int_field(dato_general, "idTipoEleccion")?,
                    id_organizacion_politica: self
                        .int_field(dato_general, "idOrganizacionPolitica")?,
                    id_solicitud_lista: self.int_field(dato_general, "idSolicitudLista")?,
                }])
            }

            _ => Ok(Vec::new()),
        }
    }

    fn malformed(&self, reason: impl Into<String>) -> HarvestError {
        HarvestError::MalformedResponse {
            key: self.key(),
            reason: reason.into(),
        }
    }

    /// Reads an integer field, accepting numeric strings (the platform
    /// serves identifiers in both forms)
    fn int_field(&self, value: &Value, name: &str) -> Result<i64, HarvestError> {
        let field = value
            .get(name)
            .ok_or_else(|| self.malformed(format!("missing field '{}'", name)))?;
        match field {
            Value::Number(n) => n
                .as_i64()
                .ok_or_else(|| self.malformed(format!("field '{}' is not an integer", name))),
            Value::String(s) => s
                .trim()
                .parse::<i64>()
                .map_err(|_| self.malformed(format!("field '{}' is not an integer", name))),
            _ => Err(self.malformed(format!("field '{}' is not an integer", name))),
        }
    }

    fn str_field(&self, value: &Value, name: &str) -> Result<String, HarvestError> {
        value
            .get(name)
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| self.malformed(format!("missing string field '{}'", name)))
    }
}

/// Builds the POST body shared by the hijo/directo expediente searches
fn expediente_search_body(expediente: &str) -> Value {
    json!({
        "pageSize": 9999999,
        "skip": 1,
        "filter": { "strCodigo": expediente },
    })
}

/// Resolves the URL of a bootstrap reference dataset
fn reference_config_url(config_type: &str, env: &Environment) -> Result<String, HarvestError> {
    let (base, path) = match config_type {
        "config" => ("apiPath", "/api/v1/config"),
        "organizacion-politica" => ("apiPath2", "/api/v1/organizacion-politica"),
        "jurado-electoral" => ("apiPath2", "/api/v1/jurado-electoral"),
        "tipo-eleccion" => ("apiPath2", "/api/v1/tipo-eleccion"),
        "experiencia-laboral" => ("apiPath3", "/api/v1/experiencia-laboral"),
        "cargo-eleccion" => ("apiPath2", "/api/v1/cargo-eleccion"),
        "expediente-dadiva" => ("apiPath3", "/api/v1/expediente-dadiva"),
        "grado-academico" => ("apiPath3", "/api/v1/grado-academico"),
        "sentencia-declarada" => ("apiPath2", "/api/v1/sentencia-declarada"),
        "ubigeo-consulta" => ("apiPath3", "/api/v1/ubigeo/consulta"),
        other => return Err(HarvestError::UnknownDataset(other.to_string())),
    };
    Ok(format!("{}{}", env.base(base)?, path))
}
