use super::{work_items_for_batch, BatchEvaluator, ComputeBackend, SearchJob};
use crate::error::{Error, Result};
use crate::nonce::Nonce;
use crate::search::SearchConfig;
use ocl::{
    builders::DeviceSpecifier::TypeFlags,
    flags::{DeviceType, MemFlags},
    Buffer, Context, Device, Kernel, Platform, Program, Queue,
};

/// Searches on the first GPU of the default OpenCL platform.
pub struct OpenClBackend {
    device: Device,
    queue: Queue,
    program: Program,
    global_size: u32,
    work_size: u32,
}

struct OpenClEvaluator {
    kernel: Kernel,
    result: Buffer<u64>,
    work_size: u32,
}

impl OpenClBackend {
    /// Whether an OpenCL GPU can be used at all.
    pub fn gpus_available() -> bool {
        Platform::first().is_ok()
            && TypeFlags(DeviceType::GPU)
                .to_device_list(None::<Platform>)
                .map(|devices| !devices.is_empty())
                .unwrap_or(false)
    }

    /// Compiles the search kernel for the first GPU. Each batch launches one
    /// work item per nonce, rounded up to whole groups of `config.work_size`.
    pub fn new(config: &SearchConfig) -> Result<Self> {
        config.validate()?;

        let device = *TypeFlags(DeviceType::GPU)
            .to_device_list(Some(Platform::default()))?
            .first()
            .ok_or_else(|| Error::backend("no OpenCL GPU found"))?;
        let context = Context::builder().devices(device).build()?;
        let queue = Queue::new(&context, device, None)?;
        let program = Program::builder()
            .src(include_str!("../sha1_prefix_search.cl"))
            .devices(device)
            .cmplr_opt("-Werror")
            .build(&context)?;

        Ok(Self {
            device,
            queue,
            program,
            global_size: config.global_size,
            work_size: config.work_size,
        })
    }
}

impl ComputeBackend for OpenClBackend {
    fn describe(&self) -> String {
        let name = self.device.name().unwrap_or_else(|_| "unknown".to_owned());
        format!("'{}' (device type: GPU)", name)
    }

    fn prepare<'a>(&'a self, job: &'a SearchJob) -> Result<Box<dyn BatchEvaluator + 'a>> {
        let to_u32 = |value: usize, what: &str| -> Result<u32> {
            value
                .try_into()
                .map_err(|_| Error::backend(format!("{} does not fit in 32 bits", what)))
        };

        let dynamic_blocks = encode_big_endian_words(job.dynamic_blocks());
        let result_host_handle = [0u64; 2];
        let result = Buffer::builder()
            .queue(self.queue.clone())
            .len(result_host_handle.len())
            .flags(MemFlags::READ_WRITE)
            .copy_host_slice(&result_host_handle)
            .build()?;

        let kernel = Kernel::builder()
            .name("sha1_prefix_search")
            .program(&self.program)
            .arg(
                &Buffer::builder()
                    .queue(self.queue.clone())
                    .len(job.target().words().len())
                    .flags(MemFlags::READ_ONLY)
                    .copy_host_slice(&job.target().words()[..])
                    .build()?,
            )
            .arg(job.target().precision_bits())
            .arg(
                &Buffer::builder()
                    .queue(self.queue.clone())
                    .len(5)
                    .flags(MemFlags::READ_ONLY)
                    .copy_host_slice(&job.intermediate_sha1_state()[..])
                    .build()?,
            )
            .arg(
                &Buffer::builder()
                    .queue(self.queue.clone())
                    .len(dynamic_blocks.len())
                    .flags(MemFlags::READ_ONLY)
                    .copy_host_slice(&dynamic_blocks)
                    .build()?,
            )
            .arg(to_u32(dynamic_blocks.len() / 16, "dynamic block count")?)
            .arg(to_u32(job.dynamic_placeholder_offset(), "placeholder offset")?)
            .arg_named("batch_start", 0u64)
            .arg_named("batch_size", 0u32)
            .arg(&result)
            .queue(self.queue.clone())
            .global_work_size(self.global_size as usize)
            .local_work_size(self.work_size as usize)
            .build()?;

        Ok(Box::new(OpenClEvaluator {
            kernel,
            result,
            work_size: self.work_size,
        }))
    }
}

impl BatchEvaluator for OpenClEvaluator {
    fn evaluate_batch(&mut self, batch_start: u64, batch_size: u32) -> Result<Option<Nonce>> {
        self.kernel.set_arg("batch_start", batch_start)?;
        self.kernel.set_arg("batch_size", batch_size)?;

        let command = self
            .kernel
            .cmd()
            .global_work_size(work_items_for_batch(batch_size, self.work_size));

        // SAFETY: The OpenCL sha1 script is optimistically assumed to have no memory safety issues
        unsafe {
            command.enq()?;
        }

        let mut result_host_handle = [0u64; 2];
        self.result.read(&mut result_host_handle[..]).enq()?;

        Ok(if result_host_handle[0] != 0 {
            Some(Nonce(result_host_handle[1]))
        } else {
            None
        })
    }
}

// The kernel reads each block as 16 big-endian words, the way SHA1 does.
fn encode_big_endian_words(bytes: &[u8]) -> Vec<u32> {
    bytes
        .chunks_exact(4)
        .map(|chunk| u32::from_be_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::encode_big_endian_words;

    #[test]
    fn blocks_are_encoded_as_big_endian_words() {
        assert_eq!(
            vec![0x74726565, 0x20000080],
            encode_big_endian_words(b"tree \x00\x00\x80")
        );
    }
}
