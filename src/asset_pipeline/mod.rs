pub mod glb_packer;
