use anyhow::{bail, Context, Result};
use time::OffsetDateTime;

use crate::database::Database;
use crate::error::{AppError, ERR_DECODE_KAFKA, ERR_ITER_FAILURE};
use crate::models::KafkaRequest;
use crate::store::KafkaStore;
use crate::utils;

impl KafkaStore for Database {
    fn find_kafkas(&self, filter: &dyn Fn(&KafkaRequest) -> bool) -> Result<Vec<KafkaRequest>> {
        let mut kafkas = Vec::new();
        for kv_res in self.kafkas_tree().iter() {
            let (_, val) = kv_res.context(ERR_ITER_FAILURE)?;
            let kafka: KafkaRequest = utils::decode_model(&val).context(ERR_DECODE_KAFKA)?;
            if kafka.is_live() && filter(&kafka) {
                kafkas.push(kafka);
            }
        }
        kafkas.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(kafkas)
    }

    fn get_kafka(&self, id: &str) -> Result<Option<KafkaRequest>> {
        let val = match self.kafkas_tree().get(id).context("error fetching kafka request")? {
            Some(val) => val,
            None => return Ok(None),
        };
        let kafka: KafkaRequest = utils::decode_model(&val).context(ERR_DECODE_KAFKA)?;
        Ok(Some(kafka).filter(KafkaRequest::is_live))
    }

    fn create_kafka(&self, kafka: &KafkaRequest) -> Result<()> {
        if kafka.id.is_empty() {
            bail!(AppError::InvalidInput("kafka id is undefined".into()));
        }
        let val = utils::encode_model(kafka)?;
        self.kafkas_tree()
            .compare_and_swap(kafka.id.as_bytes(), None as Option<&[u8]>, Some(val))
            .context("error creating kafka request")?
            .map_err(|_| AppError::InvalidInput(format!("kafka {} already exists", kafka.id)))?;
        Ok(())
    }

    fn update_kafka(&self, kafka: &KafkaRequest) -> Result<()> {
        let mut kafka = kafka.clone();
        kafka.updated_at = OffsetDateTime::now_utc();
        let val = utils::encode_model(&kafka)?;
        self.kafkas_tree()
            .insert(kafka.id.as_bytes(), val)
            .with_context(|| format!("error updating kafka request {}", kafka.id))?;
        Ok(())
    }

    fn modify_kafka(&self, id: &str, mutation: &mut dyn FnMut(&mut KafkaRequest) -> bool) -> Result<Option<KafkaRequest>> {
        let tree = self.kafkas_tree();
        loop {
            let old = tree
                .get(id)
                .context("error fetching kafka request")?
                .ok_or_else(|| AppError::ResourceNotFound(format!("kafka {}", id)))?;
            let mut kafka: KafkaRequest = utils::decode_model(&old).context(ERR_DECODE_KAFKA)?;
            if !kafka.is_live() {
                bail!(AppError::ResourceNotFound(format!("kafka {}", id)));
            }
            if !mutation(&mut kafka) {
                return Ok(None);
            }

            kafka.updated_at = OffsetDateTime::now_utc();
            let new = utils::encode_model(&kafka)?;
            let swapped = tree
                .compare_and_swap(id.as_bytes(), Some(&old), Some(new))
                .with_context(|| format!("error updating kafka request {}", id))?;
            match swapped {
                Ok(()) => return Ok(Some(kafka)),
                // Another writer raced this one, apply the mutation again on top of its write.
                Err(_) => continue,
            }
        }
    }

    fn delete_kafka(&self, id: &str) -> Result<()> {
        let mut kafka = self
            .get_kafka(id)?
            .ok_or_else(|| AppError::ResourceNotFound(format!("kafka {}", id)))?;
        kafka.deleted_at = Some(OffsetDateTime::now_utc());
        self.update_kafka(&kafka)
    }
}
